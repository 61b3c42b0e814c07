use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use jvm_stress::driver::generate;
use jvm_stress::emitter::SourceEmitter;
use jvm_stress::manifest::{Manifest, Summary};
use jvm_stress::names;
use jvm_stress::profile::get_profile;

#[derive(Parser)]
#[command(name = "jvm-stress")]
#[command(about = "Generate random, semantically valid Java programs for JVM stress testing")]
struct Cli {
    /// Generation profile name or path to a TOML file
    #[arg(long, default_value = "default")]
    profile: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Class name (default: random adjective-animal)
    #[arg(long)]
    name: Option<String>,

    /// Output directory
    #[arg(long, default_value = "/tmp/jvm-stress")]
    output: PathBuf,

    /// Upper bound for loop iteration counts
    #[arg(long)]
    max_loop_iterations: Option<u32>,

    /// Maximum number of `else if` branches per `if`
    #[arg(long)]
    if_branching_factor: Option<usize>,

    /// Maximum operand count of an operator statement
    #[arg(long)]
    max_operators: Option<usize>,

    /// Guard library calls that may overflow
    #[arg(long)]
    no_overflow: bool,

    /// Guard divisions that may divide by zero
    #[arg(long)]
    no_div_by_zero: bool,

    /// How many times `main` calls `run()`
    #[arg(long)]
    runs: Option<u32>,
}

/// Install the stderr subscriber when `JVM_STRESS_LOG` is set.
/// `JVM_STRESS_LOG_STYLE=full` adds span open/close events.
fn init_tracing() {
    let Ok(filter) = EnvFilter::try_from_env("JVM_STRESS_LOG") else {
        return;
    };
    let style = std::env::var("JVM_STRESS_LOG_STYLE").unwrap_or_default();
    if style == "full" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
    tracing::debug!("tracing initialized");
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let mut profile = match get_profile(&cli.profile) {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let generation = &mut profile.generation;
    if let Some(n) = cli.max_loop_iterations {
        generation.max_loop_iterations = n;
    }
    if let Some(n) = cli.if_branching_factor {
        generation.if_branching_factor = n;
    }
    if let Some(n) = cli.max_operators {
        generation.max_operators = n;
    }
    generation.no_overflow |= cli.no_overflow;
    generation.no_div_by_zero |= cli.no_div_by_zero;
    if let Some(runs) = cli.runs {
        profile.driver.runs = runs;
    }

    // Determine seed - use provided or generate from current time
    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });
    profile.generation.seed = seed;

    // Naming draws from its own stream so `--name` does not change the body.
    let class_name = cli.name.unwrap_or_else(|| {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        names::class_name(&mut rng)
    });

    if let Err(e) = fs::create_dir_all(&cli.output) {
        eprintln!(
            "error: failed to create output directory '{}': {}",
            cli.output.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let span = tracing::info_span!("generate", seed, class = %class_name);
    let _guard = span.enter();

    let mut emitter = SourceEmitter::new(&class_name);
    let generated = match generate(&profile, seed, &class_name, &mut emitter) {
        Ok(generated) => generated,
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(repro) = e.repro() {
                eprint!("{}", repro.report());
                match repro.write_to_dir(&cli.output, &class_name) {
                    Ok(path) => eprintln!("failure report written to {}", path.display()),
                    Err(e) => eprintln!("error: failed to write failure report: {e}"),
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let source_path = cli.output.join(format!("{class_name}.java"));
    if let Err(e) = fs::write(&source_path, emitter.render()) {
        eprintln!("error: failed to write '{}': {}", source_path.display(), e);
        return ExitCode::FAILURE;
    }

    let summary = Summary {
        fields: generated.class.fields().len(),
        methods: generated.class.methods().count(),
        call_edges: generated
            .class
            .methods()
            .map(|(_, m)| m.direct_calls().len())
            .sum(),
        actions: generated.trace.len(),
    };
    let manifest = Manifest::new(
        seed,
        cli.profile.clone(),
        class_name.clone(),
        profile,
        summary.clone(),
    );
    if let Err(e) = manifest.write_to_dir(&cli.output) {
        eprintln!("error: failed to write manifest: {e}");
        return ExitCode::FAILURE;
    }

    println!("jvm-stress: Generated class {class_name}");
    println!("  seed:    {seed}");
    println!("  profile: {}", cli.profile);
    println!(
        "  methods: {} ({} call edges)",
        summary.methods, summary.call_edges
    );
    println!("  fields:  {}", summary.fields);
    println!("  actions: {}", summary.actions);
    println!("  output:  {}", source_path.display());

    ExitCode::SUCCESS
}
