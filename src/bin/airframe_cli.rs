use std::fs;
use std::path::PathBuf;

use airframe_engine::config::{Configuration, EngineSettings};
use airframe_engine::geom::Point3;
use airframe_engine::report::ConfigurationReport;

const USAGE: &str = r#"airframe_cli (airframe-engine)

USAGE:
  airframe_cli report <file> [--settings <file>]
  airframe_cli flap <file> <wing-uid> <device-uid> <percent> [--settings <file>]
  airframe_cli eta-xsi <file> <wing-uid> <x> <y> <z> [--settings <file>]

COMMANDS:
  report     Print volume, areas, span and MAC of every wing and fuselage
  flap       Deflect one trailing edge device and print the wing's volume and bounds
  eta-xsi    Locate a point on a wing's segments

OPTIONS:
  --settings <file>  Engine settings XML (defaults apply to absent fields)
  -h, --help         Show this help
"#;

fn main() {
    airframe_engine::initialize();
    if let Err(err) = run() {
        eprintln!("airframe_cli error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut args = Args::new(args);

    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "report" => cmd_report(&mut args),
        "flap" => cmd_flap(&mut args),
        "eta-xsi" => cmd_eta_xsi(&mut args),
        "-h" | "--help" | "help" => {
            print_usage();
            Ok(())
        }
        other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
    }
}

fn print_usage() {
    println!("{USAGE}");
}

fn cmd_report(args: &mut Args) -> Result<(), String> {
    let file = args.positional("configuration file")?;
    let configuration = load(&file, args)?;
    let report = ConfigurationReport::collect(&configuration).map_err(|e| e.to_string())?;
    let xml = report.to_xml_string().map_err(|e| format!("serialize report: {e}"))?;
    println!("{xml}");
    Ok(())
}

fn cmd_flap(args: &mut Args) -> Result<(), String> {
    let file = args.positional("configuration file")?;
    let wing_uid = args.positional("wing uid")?;
    let device_uid = args.positional("device uid")?;
    let percent = parse_number(&args.positional("percent")?)?;
    let mut configuration = load(&file, args)?;
    let wing = configuration
        .wing_by_uid_mut(&wing_uid)
        .map_err(|e| e.to_string())?;

    let shape = wing
        .extend_flap(&device_uid, percent)
        .map_err(|e| e.to_string())?;
    let kernel = configuration.kernel();
    let volume = kernel.volume(&shape).map_err(|e| e.to_string())?;
    let bounds = kernel.bounding_box(&shape).map_err(|e| e.to_string())?;
    println!("wing {wing_uid} device {device_uid} deflection {percent}%");
    println!("volume {volume:.6}");
    println!(
        "bbox min ({:.6}, {:.6}, {:.6}) max ({:.6}, {:.6}, {:.6})",
        bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
    );
    Ok(())
}

fn cmd_eta_xsi(args: &mut Args) -> Result<(), String> {
    let file = args.positional("configuration file")?;
    let wing_uid = args.positional("wing uid")?;
    let x = parse_number(&args.positional("x")?)?;
    let y = parse_number(&args.positional("y")?)?;
    let z = parse_number(&args.positional("z")?)?;
    let configuration = load(&file, args)?;
    let wing = configuration
        .wing_by_uid(&wing_uid)
        .map_err(|e| e.to_string())?;

    match wing
        .segment_eta_xsi(Point3::new(x, y, z))
        .map_err(|e| e.to_string())?
    {
        Some(found) => println!(
            "segment {} ({}) eta {:.6} xsi {:.6} {}",
            found.segment_index,
            found.segment_uid,
            found.eta,
            found.xsi,
            if found.on_top { "upper" } else { "lower" }
        ),
        None => println!("point is not on wing {wing_uid}"),
    }
    Ok(())
}

/// Consumes the trailing options and reads the configuration.
fn load(file: &str, args: &mut Args) -> Result<Configuration, String> {
    let mut settings_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => settings_path = Some(PathBuf::from(args.value("--settings")?)),
            other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
        }
    }

    let settings = match settings_path {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .map_err(|e| format!("read {}: {e}", path.display()))?;
            EngineSettings::from_xml_str(&text).map_err(|e| format!("settings: {e}"))?
        }
        None => EngineSettings::default(),
    };
    Configuration::from_file(file, settings).map_err(|e| format!("{file}: {e}"))
}

fn parse_number(text: &str) -> Result<f64, String> {
    text.parse::<f64>()
        .map_err(|_| format!("`{text}` is not a number"))
}

struct Args {
    args: Vec<String>,
    pos: usize,
}

impl Args {
    fn new(args: Vec<String>) -> Self {
        Self { args, pos: 0 }
    }

    fn next(&mut self) -> Option<String> {
        let arg = self.args.get(self.pos)?.clone();
        self.pos += 1;
        Some(arg)
    }

    fn value(&mut self, flag: &str) -> Result<String, String> {
        self.next()
            .ok_or_else(|| format!("missing value for {flag}"))
    }

    fn positional(&mut self, what: &str) -> Result<String, String> {
        self.next()
            .ok_or_else(|| format!("missing {what}\n\n{USAGE}"))
    }
}
