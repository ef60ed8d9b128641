use tectum::prelude::*;

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let json = args.iter().any(|a| a == "--json");
    let seed = parse_seed(&args);

    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h" || args[1] == "help") {
        print_help();
        return;
    }
    if args.len() >= 2 && args[1] == "sweep-demo" {
        run_model(sweep_config(seed), json);
        return;
    }
    if args.len() >= 2 && args[1] == "ocular-demo" {
        run_model(ocular_config(seed), json);
        return;
    }
    if args.len() >= 2 && args[1] == "graded-demo" {
        run_model(graded_config(seed), json);
        return;
    }

    if args.len() >= 2 && !args[1].starts_with("--") && args[1] != "run" {
        eprintln!("Unknown command: {}", args[1]);
        print_help();
        std::process::exit(2);
    }

    // Default: paired-neuron stimulation with square polarity markers, the
    // configuration that reliably forms an ordered map.
    run_model(pairs_config(seed), json);
}

fn print_help() {
    println!("tectum (retinotopic map formation model)");
    println!("usage:");
    println!("  cargo run                 # paired-stimulus development, 3 maps");
    println!("  cargo run -- sweep-demo   # deterministic row/column sweeps");
    println!("  cargo run -- ocular-demo  # alternating half-sheet stimulation");
    println!("  cargo run -- graded-demo  # graded polarity markers");
    println!("  cargo run -- --seed N     # fixed seed for a reproducible batch");
    println!("  cargo run -- --json       # machine-readable quality summary");
    println!("  cargo run -- --help");
}

fn parse_seed(args: &[String]) -> Option<u64> {
    let pos = args.iter().position(|a| a == "--seed")?;
    let value = args.get(pos + 1)?;
    match value.parse() {
        Ok(seed) => Some(seed),
        Err(_) => {
            eprintln!("--seed expects an integer, got {value:?}");
            std::process::exit(2);
        }
    }
}

fn pairs_config(seed: Option<u64>) -> SimConfig {
    SimConfig {
        retina: SheetDims::new(8, 8),
        tectum: SheetDims::new(10, 10),
        pattern: ActivityPattern::Pairs,
        epochs: 4000,
        repeats: 3,
        seed,
        ..SimConfig::default()
    }
}

fn sweep_config(seed: Option<u64>) -> SimConfig {
    // A whole row or column fires at once, so the firing and modification
    // thresholds scale with the sheet dimension and the learning rate drops.
    SimConfig {
        retina: SheetDims::new(8, 8),
        tectum: SheetDims::new(10, 10),
        pattern: ActivityPattern::Sweep,
        relaxation: RelaxationConfig {
            theta: 80.0,
            ..RelaxationConfig::default()
        },
        modification_threshold: 16.0,
        learning_rate: 0.0001,
        epochs: 4000,
        repeats: 3,
        seed,
        ..SimConfig::default()
    }
}

fn ocular_config(seed: Option<u64>) -> SimConfig {
    // Half the sheet fires at once; thresholds scale accordingly.
    SimConfig {
        retina: SheetDims::new(8, 8),
        tectum: SheetDims::new(10, 10),
        pattern: ActivityPattern::OccularDominance,
        relaxation: RelaxationConfig {
            theta: 320.0,
            ..RelaxationConfig::default()
        },
        modification_threshold: 64.0,
        learning_rate: 0.000025,
        epochs: 4000,
        repeats: 3,
        seed,
        ..SimConfig::default()
    }
}

fn graded_config(seed: Option<u64>) -> SimConfig {
    SimConfig {
        polarity: PolarityMarkers::Graded,
        ..pairs_config(seed)
    }
}

fn run_model(cfg: SimConfig, json: bool) {
    let report = match run(&cfg) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("configuration rejected: {err}");
            std::process::exit(2);
        }
    };

    for (i, outcome) in report.completed.iter().enumerate() {
        println!("Map {}", i + 1);
        println!("Quality = {:.6}", outcome.quality);
    }
    for (repeat, err) in &report.failures {
        println!("Map {} failed: {err}", repeat + 1);
    }

    if let (Some(mean), Some(std)) = (report.mean_quality(), report.std_quality()) {
        println!("Quality Statistics");
        println!("Mean Quality = {mean:.6}");
        println!("Std = {std:.6}");
    }

    if json {
        let summary = serde_json::json!({
            "qualities": report.qualities(),
            "mean_quality": report.mean_quality(),
            "std_quality": report.std_quality(),
            "failed_repeats": report.failures.iter().map(|(i, e)| {
                serde_json::json!({ "repeat": i, "error": e.to_string() })
            }).collect::<Vec<_>>(),
        });
        println!("{summary}");
    }

    if report.completed.is_empty() {
        std::process::exit(1);
    }
}
