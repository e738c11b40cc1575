use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use glance_core::platform::{create_platform, hotkey};
use glance_core::{logger, Engine, EngineConfig, Profile};

const USAGE: &str = "\
usage: glance [--stub] [--dry-run] [--config <file>] [--profile <file>] <command>

commands:
  probe <element>                 observed vs expected color per anchor
  visible <element>               one-shot visibility check
  wait <element> [secs]           wait until visible
  gone <element> [secs]           wait until not visible
  tap <element>                   click the element's target point
  click <x> <y>                   click a reference-canvas point
  state <state> [secs]            check (or wait for) a screen state
  goto <element> <state> [n]      click until the state shows, n retries
  recover                         return to the home state";

struct Args {
    stub: bool,
    dry_run: bool,
    config: PathBuf,
    profile: PathBuf,
    command: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut args = Args {
        stub: false,
        dry_run: false,
        config: cwd.join("settings.json"),
        profile: cwd.join("profiles").join("arknights.json"),
        command: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--stub" => args.stub = true,
            "--dry-run" => args.dry_run = true,
            "--config" => args.config = it.next().ok_or_else(|| anyhow!("--config needs a path"))?.into(),
            "--profile" => args.profile = it.next().ok_or_else(|| anyhow!("--profile needs a path"))?.into(),
            "-h" | "--help" => bail!("{}", USAGE),
            _ => {
                args.command.push(a);
                args.command.extend(it.by_ref());
            }
        }
    }
    if args.command.is_empty() {
        bail!("{}", USAGE);
    }
    Ok(args)
}

fn secs(arg: Option<&String>) -> Result<Option<Duration>> {
    arg.map(|s| -> Result<Duration> {
        let v: f64 = s.parse().with_context(|| format!("bad seconds '{}'", s))?;
        Ok(Duration::from_secs_f64(v.max(0.0)))
    })
    .transpose()
}

fn arg<'a>(cmd: &'a [String], i: usize, what: &str) -> Result<&'a str> {
    cmd.get(i).map(String::as_str).ok_or_else(|| anyhow!("missing {}\n\n{}", what, USAGE))
}

fn run(engine: &mut Engine, cmd: &[String]) -> Result<bool> {
    let ok = match cmd[0].as_str() {
        "probe" => {
            let name = arg(cmd, 1, "element")?;
            let probes = engine.probe(name);
            if probes.is_empty() {
                bail!("'{}' has no anchors", name);
            }
            for (a, found) in &probes {
                let seen = found.map_or_else(|| "-".to_string(), |c| c.to_string());
                println!("({:>4}, {:>4}) expected {} found {}", a.point.x, a.point.y, a.color, seen);
            }
            engine.is_visible(name, None)
        }
        "visible" => engine.is_visible(arg(cmd, 1, "element")?, None),
        "wait" => engine.wait_visible(arg(cmd, 1, "element")?, secs(cmd.get(2))?, None),
        "gone" => engine.wait_gone(arg(cmd, 1, "element")?, secs(cmd.get(2))?, None),
        "tap" => engine.tap(arg(cmd, 1, "element")?),
        "click" => {
            let x = arg(cmd, 1, "x")?.parse::<i32>().context("bad x")?;
            let y = arg(cmd, 2, "y")?.parse::<i32>().context("bad y")?;
            engine.click(x, y)
        }
        "state" => {
            let state = arg(cmd, 1, "state")?;
            match secs(cmd.get(2))? {
                Some(t) => engine.wait_state(state, Some(t)),
                None => engine.is_state(state),
            }
        }
        "goto" => {
            let target = arg(cmd, 1, "element")?;
            let state = arg(cmd, 2, "state")?;
            let retries = cmd.get(3).map(|s| s.parse::<u32>()).transpose().context("bad retries")?;
            let nav = engine.navigate_to(target, state, retries);
            println!("attempts {}, recoveries {}", nav.attempts, nav.recoveries);
            nav.arrived
        }
        "recover" => engine.recover(),
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    };
    Ok(ok)
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    match start(args) {
        Ok(true) => {
            println!("ok");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn start(args: Args) -> Result<bool> {
    let logs_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("logs");
    if let Err(e) = logger::init(&logs_dir) {
        eprintln!("log file unavailable: {}", e);
    }
    logger::set_console(true);

    let mut cfg = EngineConfig::load(&args.config);
    if args.dry_run {
        cfg.safety.dry_run = true;
    }
    let profile = Profile::load(&args.profile)?;
    logger::info(&format!(
        "profile {}: {} elements, {} states",
        args.profile.display(),
        profile.elements.len(),
        profile.states.len()
    ));

    let platform = create_platform(args.stub);
    let mut engine = Engine::attach(platform.as_ref(), profile, cfg);

    let safety = engine.config().safety.clone();
    if safety.enable_panic_key {
        hotkey::start_panic_key_listener(&safety.panic_key, engine.abort_flag());
    }

    run(&mut engine, &args.command)
}
