//! SINGULARITY: persistent hyperdimensional associative memory.
//!
//! This is the CLI binary entry point.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use singularity::runtime::organism::{Admission, Organism, OrganismConfig};
use tracing_subscriber::EnvFilter;

/// SINGULARITY command line.
#[derive(Parser, Debug)]
#[command(
    name = "singularity",
    about = "Persistent hyperdimensional associative memory",
    version
)]
struct Cli {
    /// Region file holding the memory counters.
    #[arg(short, long)]
    region: Option<PathBuf>,

    /// JSON file with a full organism configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reject content orthogonal to the axiom.
    #[arg(long, default_value_t = false)]
    admission: bool,

    /// Run the background daemons for the duration of the command.
    #[arg(long, default_value_t = false)]
    daemons: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Superimpose words into memory.
    Assimilate {
        /// Encode the words as an ordered sequence.
        #[arg(long, default_value_t = false)]
        sequence: bool,

        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Recall the concept for each name.
    Divine {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// "a is to b as c is to ?"
    Analogy { a: String, b: String, c: String },

    /// Write a concept vector as a FASTA plasmid.
    Dna {
        name: String,

        /// Directory to write `<NAME>_Plasmid.fasta` into.
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Print memory telemetry.
    Status {
        /// Emit JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Wipe the region and return to genesis.
    Format,

    /// Interactive session on stdin with daemons running.
    Shell,
}

fn load_config(cli: &Cli) -> anyhow::Result<OrganismConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => OrganismConfig::default(),
    };
    if let Some(region) = &cli.region {
        config.region_path = region.clone();
    }
    if cli.admission {
        config.enforce_admission = true;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing::info!("SINGULARITY v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Region: {}", config.region_path.display());

    let organism = Organism::boot(config).context("boot failed")?;
    if cli.daemons || matches!(cli.command, Command::Shell) {
        organism.start_daemons()?;
    }

    match &cli.command {
        Command::Assimilate { sequence, words } => {
            let admissions = if *sequence {
                let refs: Vec<&str> = words.iter().map(String::as_str).collect();
                organism.assimilate_sequence(&refs)
            } else {
                words.iter().map(|w| organism.assimilate(w)).collect()
            };
            let rejected = admissions
                .iter()
                .filter(|a| **a == Admission::Rejected)
                .count();
            println!("assimilated {} of {}", words.len() - rejected, words.len());
        }
        Command::Divine { names } => {
            for name in names {
                println!("{} => {}", name, organism.divine(name));
            }
        }
        Command::Analogy { a, b, c } => {
            println!("{}", organism.analogy(a, b, c));
        }
        Command::Dna { name, out } => print_transcription(&organism, name, out)?,
        Command::Status { json } => print_status(&organism, *json)?,
        Command::Format => {
            organism.format()?;
            println!("formatted {}", organism.config().region_path.display());
        }
        Command::Shell => run_shell(&organism)?,
    }

    organism.shutdown()?;
    Ok(())
}

fn print_status(organism: &Organism, json: bool) -> anyhow::Result<()> {
    let status = organism.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("region          {}", status.region_path.display());
    println!("concepts        {} ({} quarantined)", status.concepts, status.quarantined);
    println!("magnitude       {}", status.magnitude);
    println!("saturation      {:.2}%", status.saturation * 100.0);
    println!("disk saturation {:.2}%", status.disk_saturation * 100.0);
    println!("entropy         {:.4}", status.entropy);
    println!(
        "homeostasis     {:?}, {} corrections",
        status.homeostasis.state, status.homeostasis.corrections
    );
    println!(
        "oracle          {} cached, {} hits, {} misses",
        status.cached_prophecies, status.oracle.hits, status.oracle.misses
    );
    println!("short-term      {}", status.short_term.join(", "));
    println!(
        "dream state     {}, {} cycles, {} neologisms",
        if status.dreaming { "asleep" } else { "awake" },
        status.activity.dream_cycles,
        status.neologisms
    );
    println!(
        "assimilations   {} ({} words, {} axiom violations)",
        status.activity.assimilations,
        status.activity.words_absorbed,
        status.activity.axiom_violations
    );
    println!("divinations     {}", status.activity.divinations);
    println!(
        "transcriptions  {} ({} bp)",
        status.activity.transcriptions, status.activity.base_pairs
    );
    println!("boot time       {} ms", status.activity.boot_time_ms);
    println!("daemons         {}", status.daemons.join(", "));
    Ok(())
}

fn print_transcription(organism: &Organism, name: &str, dir: &Path) -> anyhow::Result<()> {
    let t = organism
        .transcribe(name, dir)
        .with_context(|| format!("failed to transcribe {name}"))?;
    println!("{} bp written to {}", t.dna.len(), t.path.display());
    Ok(())
}

fn run_shell(organism: &Organism) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        match shell_command(organism, &parts) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("error: {e:#}"),
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    println!();
    Ok(())
}

/// Run one shell line. Returns `false` when the session should end.
fn shell_command(organism: &Organism, parts: &[&str]) -> anyhow::Result<bool> {
    match parts {
        [] => {}
        ["quit"] | ["exit"] => return Ok(false),
        [comment, ..] if comment.starts_with('#') => {}
        ["assimilate", words @ ..] if !words.is_empty() => {
            for word in words {
                println!("{:?}", organism.assimilate(word));
            }
        }
        ["sequence", words @ ..] if !words.is_empty() => {
            println!("{:?}", organism.assimilate_sequence(words));
        }
        ["divine", name] => println!("{}", organism.divine(name)),
        ["associate", key, value] => println!("{:?}", organism.associate(key, value)),
        ["recall", key] => println!("{}", organism.recall_association(key)),
        ["analogy", a, b, c] => println!("{}", organism.analogy(a, b, c)),
        ["unroll"] => println!("{}", organism.unroll_sequence(0, 32).join(" ")),
        ["unroll", start, steps] => {
            let start: usize = start.parse().context("start must be a number")?;
            let steps: usize = steps.parse().context("steps must be a number")?;
            println!("{}", organism.unroll_sequence(start, steps).join(" "));
        }
        ["nearest", name] => print_nearest(organism, name, 5),
        ["nearest", name, k] => {
            let k: usize = k.parse().context("k must be a number")?;
            print_nearest(organism, name, k);
        }
        ["dna", name] => print_transcription(organism, name, Path::new("."))?,
        ["sleep"] => {
            organism.sleep();
            println!("dreaming");
        }
        ["wake"] => {
            organism.wake();
            println!("awake");
        }
        ["quarantine", name] => println!("{}", organism.quarantine(name)),
        ["release", name] => println!("{}", organism.release(name)),
        ["status"] => print_status(organism, false)?,
        ["flush"] => organism.flush()?,
        ["format"] => organism.format()?,
        _ => bail!("unknown command: {}", parts.join(" ")),
    }
    Ok(true)
}

fn print_nearest(organism: &Organism, name: &str, k: usize) {
    for candidate in organism.nearest(name, k) {
        println!("{:>6}  {}", candidate.distance, candidate.name);
    }
}
