use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flowgen::codegen::{CodegenOptions, ModuleFormat};
use flowgen::pass::PassId;
use flowgen::pipeline::{run_pipeline, CompilationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    Js,
    Ir,
    Dot,
    BuildInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ModuleArg {
    Esm,
    Commonjs,
}

#[derive(Parser, Debug)]
#[command(
    name = "flowgen",
    version,
    about = "flowgen — generates push-based reactive pipelines from dataflow IR documents"
)]
struct Cli {
    /// Input IR document (.json)
    source: PathBuf,

    /// Output file path (`-` for stdout). Defaults to <source>.js for js,
    /// stdout otherwise.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Js)]
    emit: EmitStage,

    /// Name of the generated factory function
    #[arg(long, default_value = "createPipeline")]
    factory: String,

    /// Module format of the generated code
    #[arg(long, value_enum, default_value_t = ModuleArg::Esm)]
    module: ModuleArg,

    /// Omit section and stratum comments
    #[arg(long)]
    no_comments: bool,

    /// Log compiler passes and timing
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_output(path: Option<&Path>, text: &str) -> std::io::Result<()> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::write(p, text),
        _ => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!(source = %cli.source.display(), emit = ?cli.emit, "flowgen starting");

    let source = match flowgen::interchange::read_source(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("flowgen: error: {}", e);
            std::process::exit(2);
        }
    };

    let options = CodegenOptions {
        factory_name: cli.factory.clone(),
        module: match cli.module {
            ModuleArg::Esm => ModuleFormat::Esm,
            ModuleArg::Commonjs => ModuleFormat::CommonJs,
        },
        comments: !cli.no_comments,
    };
    let terminal = match cli.emit {
        EmitStage::Js => PassId::Codegen,
        EmitStage::Ir | EmitStage::Dot | EmitStage::BuildInfo => PassId::Load,
    };

    let mut state = CompilationState::new(source);
    let result = run_pipeline(&mut state, terminal, &options, |_, diags| {
        for d in diags {
            eprintln!("flowgen: {}", d);
        }
    });
    if let Err(e) = result {
        eprintln!("flowgen: {}", e);
        std::process::exit(1);
    }

    let text = match cli.emit {
        EmitStage::Js => state.generated.map(|g| g.source),
        EmitStage::Ir => state.graph.as_ref().map(|g| g.to_string()),
        EmitStage::Dot => state.graph.as_ref().map(flowgen::dot::emit_dot),
        EmitStage::BuildInfo => match state.provenance.as_ref().map(|p| p.to_json()) {
            Some(Ok(json)) => Some(json),
            Some(Err(e)) => {
                eprintln!("flowgen: error: {}", e);
                std::process::exit(2);
            }
            None => None,
        },
    };
    let Some(text) = text else {
        eprintln!("flowgen: no output produced");
        std::process::exit(1);
    };

    let default_js = cli.source.with_extension("js");
    let target = match (&cli.output, cli.emit) {
        (Some(p), _) => Some(p.as_path()),
        (None, EmitStage::Js) => Some(default_js.as_path()),
        (None, _) => None,
    };
    if let Err(e) = write_output(target, &text) {
        eprintln!("flowgen: error: writing output: {}", e);
        std::process::exit(2);
    }
}
