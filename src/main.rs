use std::{fs::File, io::Write};

use djangoapp_operator::{
    cli::{
        self, CliArgs, CliCommands, ControllerArgs, ControllerCommands, ControllerRunArgs, CrdArgs,
        CrdCommands, CrdGenerateArgs, CrdGenerateArgsFormat,
    },
    django_app, http_server,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = &cli::parse();

    match &cli.command {
        CliCommands::Controller(controller) => match &controller.command {
            ControllerCommands::Run(run) => controller_run(cli, controller, run).await,
        },
        CliCommands::Crd(crd) => match &crd.command {
            CrdCommands::Generate(generate) => crd_generate(cli, crd, generate),
        },
    }
}

async fn controller_run(_cli: &CliArgs, _controller: &ControllerArgs, run: &ControllerRunArgs) {
    let addr = format!("{}:{}", run.host, run.port).parse().unwrap();

    let http_server = http_server::run(addr);
    let controller = django_app::run_controller();

    tokio::select! {
        _ = http_server => {},
        _ = controller => {},
    }
}

fn crd_generate(_cli: &CliArgs, _crd: &CrdArgs, generate: &CrdGenerateArgs) {
    let crd = django_app::generate_custom_resource_definition();

    let content = match generate.format {
        CrdGenerateArgsFormat::Json => serde_json::to_string_pretty(&crd).unwrap(),
        CrdGenerateArgsFormat::Yaml => serde_yaml::to_string(&crd).unwrap(),
    };

    if let Some(output) = &generate.output {
        let path = match generate.format {
            CrdGenerateArgsFormat::Json => output.join("djangoapp.json"),
            CrdGenerateArgsFormat::Yaml => output.join("djangoapp.yaml"),
        };

        File::create(path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
    } else {
        print!("{content}");
    }
}
