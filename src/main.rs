use std::io::Read;

use clap::Parser;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tanka_guard::{
    attach_reference_sample, candidate_text, check_meter, normalize, AdminStore, Checker,
    EvaluationRecord, MemoryStore,
};

#[derive(Parser)]
#[command(
    name = "tanka-guard",
    about = "Repair and recount the tanka critique returned by a language model",
    version
)]
struct Cli {
    /// Files holding raw model output (reads stdin if none provided)
    files: Vec<String>,

    /// Input is a full generateContent response body rather than bare text
    #[arg(long)]
    envelope: bool,

    /// The submitted poem; enables NG-word screening, the sample shortcut and access logging
    #[arg(long)]
    poem: Option<String>,

    /// Word to reject submissions on (repeatable)
    #[arg(long = "ng-word")]
    ng_words: Vec<String>,

    /// Model name stamped on the result and recorded in the access log
    #[arg(long, default_value = "unknown")]
    model: String,

    /// Attach a 5-7-5-7-7 meter report for the input phrases
    #[arg(long)]
    meter: bool,

    /// Single-line JSON output
    #[arg(long)]
    compact: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: Option<&str>) -> tanka_guard::Result<String> {
    let input = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            input
        }
    };
    Ok(input)
}

fn model_text(cli: &Cli, raw: &str) -> tanka_guard::Result<String> {
    if cli.envelope {
        let body: serde_json::Value = serde_json::from_str(raw)?;
        Ok(candidate_text(&body)?.to_string())
    } else {
        Ok(raw.to_string())
    }
}

fn process(
    cli: &Cli,
    checker: &Checker<MemoryStore>,
    source: Option<&str>,
) -> tanka_guard::Result<EvaluationRecord> {
    let raw = read_source(source)?;
    debug!(
        source = source.unwrap_or("<stdin>"),
        bytes = raw.len(),
        "read model output"
    );

    match &cli.poem {
        Some(poem) => checker.evaluate("local", poem, |_, _| model_text(cli, &raw)),
        None => {
            let mut record = normalize(&model_text(cli, &raw)?)?;
            attach_reference_sample(&mut record);
            record.stamp_model(&cli.model);
            Ok(record)
        }
    }
}

fn render(cli: &Cli, record: EvaluationRecord) -> String {
    let output = if cli.meter {
        let report = check_meter(&record.input_phrases());
        json!({ "evaluation": record, "meter": report })
    } else {
        record.into_value()
    };
    let rendered = if cli.compact {
        serde_json::to_string(&output)
    } else {
        serde_json::to_string_pretty(&output)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = MemoryStore::new();
    store.set_ng_words(cli.ng_words.clone());
    let checker = Checker::with_models(store, vec![cli.model.clone()]);

    let sources: Vec<Option<&str>> = if cli.files.is_empty() {
        vec![None]
    } else {
        cli.files.iter().map(|f| Some(f.as_str())).collect()
    };

    let mut failed = false;
    for source in sources {
        match process(&cli, &checker, source) {
            Ok(record) => println!("{}", render(&cli, record)),
            Err(e) => {
                eprintln!("{}: {} error: {e}", source.unwrap_or("<stdin>"), e.kind());
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}
