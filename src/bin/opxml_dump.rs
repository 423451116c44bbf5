use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use indoc::indoc;
use log::LevelFilter;
use simplelog::{Config, WriteLogger};

use opxml::{
    CallData, CancellationToken, DocumentKind, OpxmlParser, OpxmlRunner, ParserSettings,
    ProcessorRegistry, RunnerSettings,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

enum Source {
    Stdin,
    File(PathBuf),
    Producer(Vec<String>),
}

struct OpxmlDump {
    source: Source,
    program: Option<String>,
    parser_settings: ParserSettings,
    expected: Option<DocumentKind>,
    output: Option<PathBuf>,
    indent: bool,
}

impl OpxmlDump {
    fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let source = match matches.get_many::<String>("run") {
            Some(args) => Source::Producer(args.cloned().collect()),
            None => match matches.get_one::<String>("input").map(String::as_str) {
                None | Some("-") => Source::Stdin,
                Some(path) => Source::File(PathBuf::from(path)),
            },
        };

        let expected = match matches.get_one::<String>("expect").map(String::as_str) {
            None => None,
            Some("info") => Some(DocumentKind::Info),
            Some("check-events") => Some(DocumentKind::CheckEvents),
            Some("model-data") => Some(DocumentKind::ModelData),
            Some("sessions") => Some(DocumentKind::Sessions),
            Some(other) => bail!("unknown document kind `{}`", other),
        };

        Ok(OpxmlDump {
            source,
            program: matches.get_one::<String>("program").cloned(),
            parser_settings: ParserSettings::new().strict(matches.get_flag("strict")),
            expected,
            output: matches.get_one::<String>("output").map(PathBuf::from),
            indent: !matches.get_flag("no-indent"),
        })
    }

    fn load(&self) -> Result<CallData> {
        let registry = ProcessorRegistry::shared();

        match &self.source {
            Source::Stdin => OpxmlParser::new(registry)
                .with_configuration(self.parser_settings.clone())
                .parse(io::stdin().lock())
                .context("failed to parse opxml document from stdin"),
            Source::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open `{}`", path.display()))?;
                OpxmlParser::new(registry)
                    .with_configuration(self.parser_settings.clone())
                    .parse(BufReader::new(file))
                    .with_context(|| format!("failed to parse `{}`", path.display()))
            }
            Source::Producer(args) => {
                let mut settings =
                    RunnerSettings::from_env().parser_settings(self.parser_settings.clone());
                if let Some(program) = &self.program {
                    settings = settings.program(program);
                }
                OpxmlRunner::new(registry)
                    .with_configuration(settings)
                    .run(args, &CancellationToken::new())
                    .with_context(|| format!("failed to run opxml with {:?}", args))
            }
        }
    }

    fn run(&self) -> Result<()> {
        let data = self.load()?;

        if let Some(expected) = self.expected {
            if data.kind() != expected {
                bail!("expected a `{}` document, found `{}`", expected, data.kind());
            }
        }

        let mut out: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path)
                    .with_context(|| format!("failed to create `{}`", path.display()))?,
            )),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };

        if self.indent {
            serde_json::to_writer_pretty(&mut out, &data)?;
        } else {
            serde_json::to_writer(&mut out, &data)?;
        }
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

fn command() -> Command {
    Command::new("opxml_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parses opxml output and prints it as JSON")
        .long_about(indoc!(
            r#"
            Parses a document written by OProfile's `opxml` helper and prints the
            resulting model as JSON.

            The document is read from INPUT, from stdin when INPUT is `-` or missing,
            or from a fresh run of the producer with `--run`:

                opxml_dump --run model-data CPU_CLK_UNHALTED current

            The producer is `opxml` on PATH unless `--program` or OPXML_PATH say otherwise.
            "#
        ))
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .help("Saved opxml document, or `-` for stdin."),
        )
        .arg(
            Arg::new("run")
                .long("run")
                .value_name("ARGS")
                .num_args(1..)
                .allow_hyphen_values(true)
                .conflicts_with("input")
                .help("Run the producer with these arguments instead of reading INPUT."),
        )
        .arg(
            Arg::new("program")
                .long("program")
                .value_name("PATH")
                .requires("run")
                .help("Producer executable used with `--run`."),
        )
        .arg(
            Arg::new("expect")
                .long("expect")
                .value_name("KIND")
                .value_parser(["info", "check-events", "model-data", "sessions"])
                .help("Fail unless the document is of this kind."),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Reject elements the processors do not know about."),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Write JSON to FILE instead of stdout."),
        )
        .arg(
            Arg::new("no-indent")
                .long("no-indent")
                .action(ArgAction::SetTrue)
                .help("Print compact JSON."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Log to stderr. -v info, -vv debug, -vvv trace."),
        )
}

fn init_logging(occurrences: u8) -> Result<()> {
    let level = match occurrences {
        0 => return Ok(()),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    WriteLogger::init(level, Config::default(), io::stderr())
        .context("failed to initialize logging")
}

fn main() -> Result<()> {
    let matches = command().get_matches();
    init_logging(matches.get_count("verbose"))?;

    OpxmlDump::from_cli_matches(&matches)?.run()
}
