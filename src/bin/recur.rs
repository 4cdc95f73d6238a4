use clap::Parser;
use jiff::civil::DateTime;
use recur::{CronExpression, RecurrenceRule, ScheduleError};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "recur",
    about = "Occurrences of RRULEs and cron expressions",
    version
)]
struct Cli {
    /// RRULE text (e.g. "FREQ=WEEKLY;BYDAY=MO") or, with --cron, a cron expression
    expression: Option<String>,

    /// Treat the expression as cron instead of RRULE
    #[arg(long)]
    cron: bool,

    /// Number of occurrences to show
    #[arg(short, long, default_value = "1")]
    n: u32,

    /// Start timestamp (default: now, local civil time)
    #[arg(long)]
    from: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Validate expression without computing
    #[arg(long)]
    check: bool,

    /// Show the parsed structure as JSON
    #[arg(long)]
    parse: bool,

    /// Print the canonical text form
    #[arg(long)]
    canonical: bool,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

enum Expr {
    Rule(RecurrenceRule),
    Cron(CronExpression),
}

impl Expr {
    fn parse(text: &str, cron: bool) -> Result<Self, ScheduleError> {
        if cron {
            CronExpression::parse(text).map(Expr::Cron)
        } else {
            RecurrenceRule::parse(text).map(Expr::Rule)
        }
    }

    fn text(&self) -> String {
        match self {
            Expr::Rule(rule) => rule.text(),
            Expr::Cron(cron) => cron.text(),
        }
    }

    fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Expr::Rule(rule) => serde_json::to_string_pretty(rule),
            Expr::Cron(cron) => serde_json::to_string_pretty(cron),
        }
    }

    fn next_n(&self, from: DateTime, n: usize) -> Vec<DateTime> {
        match self {
            Expr::Rule(rule) => rule.next_n(from, n),
            Expr::Cron(cron) => cron.occurrences(from).take(n).collect(),
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "recur=warn",
        1 => "recur=debug",
        _ => "recur=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn parse_from(text: &str) -> Option<DateTime> {
    text.parse()
        .ok()
        .or_else(|| recur::lexer::parse_timestamp(text))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let expression = match cli.expression {
        Some(ref expr) => expr.as_str(),
        None => {
            eprintln!("error: no expression provided");
            process::exit(2);
        }
    };

    let expr = match Expr::parse(expression, cli.cron) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("{}", e.display_rich());
            process::exit(1);
        }
    };

    if cli.check {
        println!("\u{2713} valid");
        process::exit(0);
    }

    if cli.parse {
        match expr.to_json() {
            Ok(json) => {
                println!("{json}");
                process::exit(0);
            }
            Err(e) => {
                eprintln!("error: failed to serialize: {e}");
                process::exit(1);
            }
        }
    }

    if cli.canonical {
        println!("{}", expr.text());
        process::exit(0);
    }

    let from = match cli.from.as_deref() {
        Some(text) => match parse_from(text) {
            Some(dt) => dt,
            None => {
                eprintln!("error: invalid --from timestamp '{text}'");
                process::exit(2);
            }
        },
        None => jiff::Zoned::now().datetime(),
    };

    // Default: compute next N occurrences
    let mut n = cli.n;
    if n > 1000 {
        eprintln!("warning: capped at 1000 occurrences");
        n = 1000;
    }

    let results = expr.next_n(from, n as usize);

    if results.is_empty() {
        eprintln!("no upcoming occurrences");
        process::exit(0);
    }

    if cli.json {
        let iso_strings: Vec<String> = results.iter().map(|dt| dt.to_string()).collect();
        match serde_json::to_string(&iso_strings) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize: {e}");
                process::exit(1);
            }
        }
    } else {
        for dt in &results {
            println!("{dt}");
        }
    }
}
