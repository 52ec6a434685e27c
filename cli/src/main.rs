mod highlighter;
mod validator;

use std::io::{BufRead, BufReader};
use std::sync::Arc;

use cardscript::{CompilationOptions, Context, Engine, Error, ExecutionOptions, render_error};
use cardscript_core::stdlib::hooks::DirectoryResolver;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, DescriptionMode, EditCommand, Emacs,
    FileBackedHistory, IdeMenu, KeyCode, KeyModifiers, Keybindings, MenuBuilder, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, default_emacs_keybindings,
};
use tracing::debug;

use crate::highlighter::Highlighter;
use crate::validator::BracketValidator;

/// Cardscript - the scripting language of card templates
#[derive(Parser, Debug)]
#[command(name = "cardscript")]
#[command(about = "Evaluate cardscript expressions", long_about = None)]
struct Args {
    /// Print the compiled bytecode (for debugging)
    #[arg(long)]
    debug_code: bool,

    /// Treat the input as the body of a string literal, like `Hello {name}!`
    #[arg(long)]
    string_mode: bool,

    /// Maximum recursion depth
    #[arg(long, default_value_t = 500)]
    max_depth: usize,

    /// Maximum number of loop steps per evaluation
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Directory `include_file` reads from
    #[arg(long)]
    include_dir: Option<std::path::PathBuf>,

    /// Expression to evaluate (if not provided, reads from stdin)
    expression: Option<String>,
}

struct Session {
    engine: Engine,
    options: CompilationOptions,
    ctx: Context,
    debug_code: bool,
}

impl Session {
    fn new(args: &Args) -> Self {
        let mut engine = Engine::default();
        if let Some(dir) = &args.include_dir {
            engine = engine.with_include_resolver(Arc::new(DirectoryResolver::new(dir)));
        }
        let ctx = engine.new_context_with(ExecutionOptions {
            max_depth: args.max_depth,
            max_iterations: args.max_iterations,
        });
        Self {
            engine,
            options: CompilationOptions {
                string_mode: args.string_mode,
            },
            ctx,
            debug_code: args.debug_code,
        }
    }

    /// Evaluate one input in the session's context. Variables assigned at
    /// the top level stay visible to later inputs.
    fn interpret(&mut self, input: &str) {
        if input.trim().is_empty() {
            return;
        }

        let script = match self.engine.compile_with(input, &self.options) {
            Ok(script) => script,
            Err(e) => {
                render_error(&e, input);
                return;
            }
        };

        if self.debug_code {
            println!("=== Bytecode ===");
            println!("{:?}", script);
        }

        let result = self
            .ctx
            .evaluate(&script, false)
            .and_then(|value| value.into_result());
        match result {
            Ok(value) => println!("{}", value.to_code()),
            Err(e) => {
                let error = Error::from(e);
                debug!(%error, "evaluation failed");
                render_error(&error, input);
            }
        }
    }
}

fn add_menu_keybindings(keybindings: &mut Keybindings) {
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    keybindings.add_binding(
        KeyModifiers::ALT,
        KeyCode::Enter,
        ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
    );
}

/// Keywords and the variables of `ctx` offered by tab completion.
fn completions(ctx: &Context) -> Vec<String> {
    let mut words: Vec<String> = [
        "if", "then", "else", "case", "of", "for", "each", "in", "from", "to", "do", "and", "or",
        "xor", "not", "div", "mod", "true", "false", "nil", "rgb", "rgba", "min", "max", "assert",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    words.extend(ctx.variable_names().iter().map(ToString::to_string));
    words
}

fn setup_reedline(ctx: &Context) -> Result<(Reedline, DefaultPrompt)> {
    let commands = completions(ctx);

    let completer = Box::new({
        let mut completions = DefaultCompleter::with_inclusions(&['_']);
        completions.insert(commands);
        completions
    });

    // Use the interactive menu to select options from the completer
    let ide_menu = IdeMenu::default()
        .with_name("completion_menu")
        .with_min_completion_width(0)
        .with_max_completion_width(50)
        .with_max_completion_height(u16::MAX)
        .with_padding(0)
        .with_cursor_offset(0)
        .with_description_mode(DescriptionMode::PreferRight)
        .with_min_description_width(0)
        .with_max_description_width(50)
        .with_description_offset(1)
        .with_correct_cursor_pos(false);

    let completion_menu = Box::new(ide_menu);

    let mut keybindings = default_emacs_keybindings();
    add_menu_keybindings(&mut keybindings);

    let edit_mode = Box::new(Emacs::new(keybindings));

    let mut line_editor = Reedline::create()
        .with_highlighter(Box::new(Highlighter::new()))
        .with_validator(Box::new(BracketValidator))
        .with_completer(completer)
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_edit_mode(edit_mode);

    if let Some(data_dir) = dirs::data_dir() {
        let history_path = data_dir.join("cardscript").join("history.txt");
        if let Some(parent) = history_path.parent() {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
        let history = FileBackedHistory::with_file(1000, history_path).into_diagnostic()?;
        line_editor = line_editor.with_history(Box::new(history));
    }

    let prompt = DefaultPrompt::new(DefaultPromptSegment::Empty, DefaultPromptSegment::Empty);

    Ok((line_editor, prompt))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use the RUST_LOG environment variable to control the log level.
    // Script output from trace() is logged at info level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .into_diagnostic()?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut session = Session::new(&args);

    // Check if we have a direct expression argument
    if let Some(expr) = &args.expression {
        session.interpret(expr);
        return Ok(());
    }

    // Otherwise, check if we're in interactive or pipe mode
    let is_interactive = atty::is(atty::Stream::Stdin);

    if is_interactive {
        let (mut line_editor, prompt) = setup_reedline(&session.ctx)?;

        println!("Cardscript REPL - Type expressions to evaluate (Ctrl+D or Ctrl+C to exit)");

        loop {
            let sig = match line_editor.read_line(&prompt) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Reedline error: {e}");
                    return Ok(());
                }
            };

            match sig {
                Signal::Success(buffer) => session.interpret(&buffer),
                Signal::CtrlD | Signal::CtrlC => {
                    println!("\nGoodbye!");
                    return Ok(());
                }
            }
        }
    } else {
        // Pipe/stdin mode: one expression per line
        let stdin = std::io::stdin();
        let reader = BufReader::new(stdin.lock());

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("Error reading line from stdin: {}", e);
                    return Ok(());
                }
            };

            session.interpret(&line);
        }
    }

    Ok(())
}
