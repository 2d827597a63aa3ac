//! sifquiz CLI
//!
//! Usage:
//!   sifquiz --bank demos/sample_bank.json              # Interactive quiz
//!   sifquiz --bank bank.json --validate                # Validate a bank
//!   sifquiz --resume sess_0123456789abcdef             # Continue a saved session
//!   sifquiz --json                                     # JSON step output

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use sifquiz::core::{load_session, save_session, FileStore, QuestionBank, QuizEngine, TracingTelemetry};
use sifquiz::types::{BankPhase, Face, LineId, OptionKey, Question, QuizPhase, SifResult, StepOutput, Verdict};
use sifquiz::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "sifquiz",
    version = VERSION,
    about = "SIF quiz - find your Primary, Secondary and Prize faces",
    long_about = "sifquiz runs the seven-line identity quiz in the terminal.\n\n\
                  Phases:\n  \
                  A          - choose three A-lines\n  \
                  B          - duel questions on the A-lines\n  \
                  C          - module questions on the other four lines\n  \
                  D          - verdicts recomputed\n  \
                  E          - anchor (Primary) selection\n  \
                  ARCHETYPE  - pick the face that feels installed\n  \
                  SUMMARY    - Primary / Secondary / Prize"
)]
struct Args {
    /// Question bank (JSON)
    #[arg(short, long, default_value = "demos/sample_bank.json")]
    bank: PathBuf,

    /// Validate the bank and exit
    #[arg(long)]
    validate: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Debug logging and IL breakdowns
    #[arg(long)]
    verbose: bool,

    /// Directory for session snapshots
    #[arg(long, default_value = "./sessions")]
    store_dir: PathBuf,

    /// Resume a saved session by id
    #[arg(long)]
    resume: Option<String>,

    /// Do not save progress
    #[arg(long)]
    no_save: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "sifquiz=debug" } else { "sifquiz=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    let bank = QuestionBank::load(&args.bank)
        .with_context(|| format!("failed to load question bank {}", args.bank.display()))?;

    if args.validate {
        print_coverage(&bank);
        return Ok(());
    }

    let store = FileStore::new(&args.store_dir);
    let mut engine = match &args.resume {
        Some(id) => {
            let snapshot = load_session(&store, id, Utc::now())
                .with_context(|| format!("failed to read session {}", id))?;
            let Some(snapshot) = snapshot else {
                bail!("session {} not found or expired", id);
            };
            QuizEngine::resume(bank, &snapshot, std::rc::Rc::new(TracingTelemetry))
                .with_context(|| format!("failed to resume session {}", id))?
        }
        None => QuizEngine::with_tracing(bank),
    };

    print_header(&engine, args.no_color);
    run_quiz(&mut engine, &args, &store)
}

/// Drive the engine phase by phase until the summary or the user quits
fn run_quiz(engine: &mut QuizEngine, args: &Args, store: &FileStore) -> Result<()> {
    loop {
        let keep_going = match engine.phase() {
            QuizPhase::A => run_phase_a(engine)?,
            QuizPhase::B | QuizPhase::C => run_questions(engine, args, store)?,
            QuizPhase::D => {
                print_verdicts(engine);
                true
            }
            QuizPhase::E => run_anchor(engine)?,
            QuizPhase::Archetype => run_archetype(engine, args)?,
            QuizPhase::Summary => {
                if let Some(result) = &engine.state().sif_result {
                    print_summary(result, args);
                }
                save(engine, args, store)?;
                return Ok(());
            }
        };
        if !keep_going {
            save(engine, args, store)?;
            println!("\nSession saved as {}. Resume with --resume {}", engine.session_id(), engine.session_id());
            return Ok(());
        }

        let reason = engine.advance()?;
        if args.verbose {
            println!("{}", format!("  └─ {}", reason).dimmed());
        }
        save(engine, args, store)?;
    }
}

fn save(engine: &QuizEngine, args: &Args, store: &FileStore) -> Result<()> {
    if args.no_save {
        return Ok(());
    }
    save_session(store, &engine.snapshot()).context("failed to save session")?;
    Ok(())
}

/// Read one trimmed line; None on EOF or quit
fn prompt(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let line = line.trim();
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
        return Ok(None);
    }
    Ok(Some(line.to_string()))
}

fn run_phase_a(engine: &mut QuizEngine) -> Result<bool> {
    println!("{} Choose three lines for the duel round:", QuizPhase::A.emoji());
    let names: Vec<&str> = LineId::ALL.iter().map(|l| l.name()).collect();
    println!("   {}", names.join(", "));
    loop {
        let Some(input) = prompt("lines> ")? else {
            return Ok(false);
        };
        let parsed: Option<Vec<LineId>> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(LineId::from_name)
            .collect();
        let Some(lines) = parsed else {
            println!("{}", "Unknown line name".red());
            continue;
        };
        match engine.select_a_lines(&lines) {
            Ok(_) => return Ok(true),
            Err(e) => println!("{}", e.to_string().red()),
        }
    }
}

fn run_questions(engine: &mut QuizEngine, args: &Args, store: &FileStore) -> Result<bool> {
    while let Some(question) = engine.next_question()? {
        print_question(&question, engine.phase());
        let output = loop {
            let Some(input) = prompt("answer> ")? else {
                return Ok(false);
            };
            let Some(choice) = OptionKey::from_input(&input) else {
                println!("{}", "Answer with A, B or C".red());
                continue;
            };
            match engine.answer(choice) {
                Ok(output) => break output,
                Err(e) => println!("{}", e.to_string().red()),
            }
        };
        print_step(&output, args);
        save(engine, args, store)?;
    }
    Ok(true)
}

fn run_anchor(engine: &mut QuizEngine) -> Result<bool> {
    if engine.needs_tie_break() {
        let options = engine.anchor_options();
        println!("{} Several lines share the top purity. Which one is you?", QuizPhase::E.emoji());
        for (i, c) in options.iter().enumerate() {
            println!("   {}. {} (purity {:.2}, {:?})", i + 1, c.face, c.purity, c.origin);
        }
        loop {
            let Some(input) = prompt("anchor> ")? else {
                return Ok(false);
            };
            let Some(face) = pick_face(&input, &options.iter().map(|c| c.face).collect::<Vec<_>>()) else {
                println!("{}", "Pick a number or a face from the list".red());
                continue;
            };
            match engine.set_anchor(face) {
                Ok(_) => break,
                Err(e) => println!("{}", e.to_string().red()),
            }
        }
    }
    if let Some(anchor) = engine.state().anchor {
        println!("{} Anchor: {}", QuizPhase::E.emoji(), anchor.to_string().bold());
    }
    Ok(true)
}

fn run_archetype(engine: &mut QuizEngine, args: &Args) -> Result<bool> {
    let shortlist = engine.state().sif_shortlist.clone();
    if shortlist.is_empty() || engine.state().installed_choice.is_some() {
        return Ok(true);
    }
    println!("{} Which of these feels installed from outside?", QuizPhase::Archetype.emoji());
    let ranking = engine.ranking().cloned().unwrap_or_default();
    for (i, face) in shortlist.iter().enumerate() {
        match ranking.shortlist.iter().find(|s| s.face == *face).filter(|_| args.verbose) {
            Some(scored) => println!("   {}. {} (IL {:.2}, base {:.2})", i + 1, face, scored.il.total, scored.il.base),
            None => println!("   {}. {}", i + 1, face),
        }
    }
    loop {
        let Some(input) = prompt("installed> ")? else {
            return Ok(false);
        };
        let Some(face) = pick_face(&input, &shortlist) else {
            println!("{}", "Pick a number or a face from the list".red());
            continue;
        };
        match engine.choose_installed(face) {
            Ok(_) => return Ok(true),
            Err(e) => println!("{}", e.to_string().red()),
        }
    }
}

/// Accept a 1-based index or a `Family:Archetype` name
fn pick_face(input: &str, faces: &[Face]) -> Option<Face> {
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| faces.get(i)).copied();
    }
    input.parse::<Face>().ok().filter(|f| faces.contains(f))
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_header(engine: &QuizEngine, no_color: bool) {
    let title = format!("SIF Quiz v{} | session {}", VERSION, engine.session_id());
    println!();
    if no_color {
        println!("{}", title);
    } else {
        println!("{}", title.bold().cyan());
    }
    println!("Type 'quit' to stop; progress is saved.");
    println!();
}

fn print_question(question: &Question, phase: QuizPhase) {
    let tag = match question.phase {
        BankPhase::Severity => "severity".yellow().to_string(),
        _ => question.line_id.to_string(),
    };
    println!();
    println!("{} [{}] {}", phase.emoji(), tag, question.prompt.bold());
    for (key, option) in &question.options {
        println!("   {}) {}", key, option.label);
    }
}

fn print_step(output: &StepOutput, args: &Args) {
    if args.json {
        match serde_json::to_string(output) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to serialize output: {}", e),
        }
    } else if args.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
    }
}

fn print_verdicts(engine: &QuizEngine) {
    let Some(result) = engine.phase_d_result() else {
        return;
    };
    println!();
    println!("{} Verdicts", QuizPhase::D.emoji());
    for lv in &result.lines {
        let marker = if lv.selected_a { "A" } else { " " };
        let verdict = match lv.verdict {
            Verdict::C => "C".green(),
            Verdict::O => "O".yellow(),
            Verdict::F => "F".red(),
        };
        let overridden = if lv.overridden() { " (severity override)" } else { "" };
        println!("   {} {:<12} {}  purity {:>5.2}{}", marker, lv.line.name(), verdict, lv.purity, overridden);
    }
}

fn print_summary(result: &SifResult, args: &Args) {
    if args.json {
        match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to serialize result: {}", e),
        }
        return;
    }
    println!();
    println!("{} Result", QuizPhase::Summary.emoji());
    println!("   Primary:   {}", result.primary.to_string().bold());
    println!("   Secondary: {} [{}]", result.secondary.to_string().bold(), result.badge);
    println!("   Prize:     {}", result.prize);
    if args.verbose {
        println!(
            "   {}",
            format!(
                "scorer={:?} source={:?} instability={:.2} stability={}",
                result.context.scorer,
                result.context.secondary_source,
                result.context.instability,
                result
                    .context
                    .stability_ratio
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "-".to_string())
            )
            .dimmed()
        );
    }
}

fn print_coverage(bank: &QuestionBank) {
    println!("Bank OK: {} questions", bank.len());
    println!("   {:<12} {:>5} {:>7} {:>9}", "line", "duel", "module", "severity");
    for line in LineId::ALL {
        println!(
            "   {:<12} {:>5} {:>7} {:>9}",
            line.name(),
            bank.count(line, BankPhase::Duel),
            bank.count(line, BankPhase::Module),
            bank.count(line, BankPhase::Severity)
        );
    }
}
