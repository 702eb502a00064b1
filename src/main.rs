use clap::Parser;
use rustyline::{error::ReadlineError, DefaultEditor};
use stackline::{
    config::StacklineConfig,
    lang::tokenizing::needs_continuation,
    runtime::{
        data_structures::{image::DictionaryImage, value::Value},
        error::{self, ErrorKind, ScriptError},
        interpreter::{
            session::Session, CommandResult, ExecutionManagement, FunctionManagement, Interpreter,
            TupleManagement,
        },
    },
};
use std::{
    env::var,
    fs,
    io::{stdin, IsTerminal},
    path::PathBuf,
    process::ExitCode,
    thread,
};
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming a directory of shared scripts.
const LIB_PATH_VARIABLE: &str = "STACKLINE_LIB_PATH";

/// Environment variable holding the log filter.
const LOG_VARIABLE: &str = "STACKLINE_LOG";

/// Native stack reserved for each level of nesting the session allows.
const STACK_PER_LEVEL: usize = 64 * 1024;

/// The interpreter thread never gets less stack than a main thread would.
const MIN_STACK: usize = 8 * 1024 * 1024;

/// Run stackline scripts, or an interactive session when no script is given.
#[derive(Parser, Debug)]
#[command(name = "stackline", version, about)]
struct Cli {
    /// Run a script file before the script or the REPL.  May be repeated.
    #[arg(short, long, value_name = "FILE")]
    include: Vec<String>,

    /// Restore a saved dictionary image at startup.
    #[arg(short, long, value_name = "IMAGE")]
    restore: Option<String>,

    /// Run one line of commands and exit.
    #[arg(short, long, value_name = "TEXT")]
    command: Option<String>,

    /// Read configuration from this file instead of searching for stackline.toml.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, for example `debug` or `stackline=trace`.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,

    /// The script to run.
    script: Option<String>,

    /// Arguments passed to the script as @args and @argc.
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

/// Log to stderr so diagnostics never mix with script output.
fn init_logging(cli: &Cli, config: &StacklineConfig) {
    let filter = cli
        .log
        .clone()
        .or_else(|| var(LOG_VARIABLE).ok())
        .unwrap_or_else(|| config.log_filter.clone());

    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Replace the session's dictionaries with those of an image file.
fn restore_image(session: &mut Session, path: &str) -> error::Result<()> {
    let full_path = session.find_file(path)?;
    let image = DictionaryImage::deserialize(&fs::read(&full_path)?)?;

    debug!(path = %full_path, functions = image.functions.len(), "restored dictionary image");

    session.functions_mut().replace(image.functions);
    session.constants_mut().replace(image.constants);

    Ok(())
}

/// Read lines until `bye` or end of input.  Lines are gathered until any open block or quotation
/// is closed, then run as one source.
fn repl(session: &mut Session, config: &StacklineConfig) -> error::Result<CommandResult> {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            return ScriptError::new(ErrorKind::External, format!("Could not start the REPL: {}", err)).into_result();
        }
    };

    if let Some(path) = &config.history_file
        && let Err(err) = editor.load_history(path)
    {
        debug!("no history loaded from {}: {}", path.display(), err);
    }

    let prompting = config.prompting && stdin().is_terminal();
    let mut result = CommandResult::Success;
    let mut pending = String::new();

    loop {
        let prompt = match (prompting, pending.is_empty()) {
            (false, _) => "",
            (true, true) => config.prompt.as_str(),
            (true, false) => config.continuation_prompt.as_str(),
        };

        match editor.readline(prompt) {
            Ok(line) => {
                if !pending.is_empty() {
                    pending.push('\n');
                }

                pending.push_str(&line);

                if needs_continuation(&pending) {
                    continue;
                }

                let source = std::mem::take(&mut pending);
                let _ = editor.add_history_entry(source.as_str());

                result = match session.process_source("<repl>", &source) {
                    Ok(result) => result,
                    Err(err) => {
                        error!("{}", err);
                        CommandResult::Failure
                    }
                };

                if session.is_goodbye() {
                    break;
                }
            }

            Err(ReadlineError::Interrupted) => pending.clear(),
            Err(ReadlineError::Eof) => break,

            Err(err) => {
                return ScriptError::new(ErrorKind::External, format!("Could not read input: {}", err)).into_result();
            }
        }
    }

    if let Some(path) = &config.history_file
        && let Err(err) = editor.save_history(path)
    {
        warn!("failed to save history to {}: {}", path.display(), err);
    }

    Ok(result)
}

fn run(cli: &Cli, config: &StacklineConfig) -> error::Result<CommandResult> {
    let mut session = Session::new();

    session.set_echo_includes(config.echo_includes);
    session.set_max_depth(config.max_depth);

    if let Ok(lib_path) = var(LIB_PATH_VARIABLE) {
        session.add_search_path(&lib_path)?;
    }

    for path in &config.search_paths {
        session.add_search_path(path)?;
    }

    let _ = session.set_tuple("args", Value::String(cli.args.join(" ")));
    let _ = session.set_tuple("argc", Value::Int(cli.args.len() as i64));

    if let Some(image) = &cli.restore {
        restore_image(&mut session, image)?;
    }

    for include in &cli.include {
        let result = session.process_source_file(include)?;

        if !result.is_success() || session.is_goodbye() {
            return Ok(result);
        }
    }

    if let Some(command) = &cli.command {
        return session.process_source("<command>", command);
    }

    if let Some(script) = &cli.script {
        return session.process_source_file(script);
    }

    repl(&mut session, config)
}

fn main() -> error::Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => StacklineConfig::load_from(path),
        None => StacklineConfig::load(),
    };

    let config = match loaded {
        Ok(config) => config,
        Err(message) => return ScriptError::new(ErrorKind::External, message).into_result(),
    };

    init_logging(&cli, &config);

    // Sessions recurse on the native stack, so they run on a thread sized for the depth limit.
    let stack_size = config.max_depth.saturating_mul(STACK_PER_LEVEL).max(MIN_STACK);
    let worker = thread::Builder::new()
        .name("stackline".to_string())
        .stack_size(stack_size)
        .spawn(move || run(&cli, &config));

    let result = match worker.map(|handle| handle.join()) {
        Ok(Ok(result)) => result?,
        Ok(Err(_)) => {
            return ScriptError::new(ErrorKind::External, "The interpreter thread panicked.").into_result();
        }
        Err(err) => {
            let message = format!("Could not start the interpreter thread: {}", err);
            return ScriptError::new(ErrorKind::External, message).into_result();
        }
    };

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
