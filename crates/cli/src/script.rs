//! Scripted viewer input for the `measure` command
//!
//! A script is a `;`-separated list of steps, e.g.
//! `enable; click 10,10; click 110,10; calibrate 5`.

use anyhow::{bail, Context, Result};
use measure_core::{FlipAxis, ViewPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Enable,
    Click(ViewPoint),
    Move(ViewPoint),
    Calibrate(f64),
    Flip(FlipAxis),
    ZoomIn,
    ZoomOut,
    Zoom(f64),
    Scale(f64),
    Pan { dx: f64, dy: f64 },
    Reset,
    Clear,
    Cancel,
}

pub fn parse_script(script: &str) -> Result<Vec<Step>> {
    script
        .split(';')
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .enumerate()
        .map(|(index, step)| {
            parse_step(step).with_context(|| format!("invalid script step {} `{step}`", index + 1))
        })
        .collect()
}

fn parse_step(step: &str) -> Result<Step> {
    let (keyword, argument) = match step.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (step, ""),
    };

    let step = match (keyword, argument) {
        ("enable", "") => Step::Enable,
        ("reset", "") => Step::Reset,
        ("clear", "") => Step::Clear,
        ("cancel", "") => Step::Cancel,
        ("click", arg) => {
            let (x, y) = parse_pair(arg)?;
            Step::Click(ViewPoint::new(x, y))
        }
        ("move", arg) => {
            let (x, y) = parse_pair(arg)?;
            Step::Move(ViewPoint::new(x, y))
        }
        ("pan", arg) => {
            let (dx, dy) = parse_pair(arg)?;
            Step::Pan { dx, dy }
        }
        ("calibrate", arg) => Step::Calibrate(parse_number(arg)?),
        ("flip", "h") => Step::Flip(FlipAxis::Horizontal),
        ("flip", "v") => Step::Flip(FlipAxis::Vertical),
        ("zoom", "in") => Step::ZoomIn,
        ("zoom", "out") => Step::ZoomOut,
        ("zoom", arg) => Step::Zoom(parse_number(arg)?),
        ("scale", arg) => Step::Scale(parse_number(arg)?),
        _ => bail!("unrecognized step"),
    };
    Ok(step)
}

fn parse_pair(arg: &str) -> Result<(f64, f64)> {
    let Some((x, y)) = arg.split_once(',') else {
        bail!("expected two comma-separated numbers, got `{arg}`");
    };
    Ok((parse_number(x)?, parse_number(y)?))
}

fn parse_number(arg: &str) -> Result<f64> {
    let arg = arg.trim();
    if arg.is_empty() {
        bail!("missing number");
    }
    arg.parse::<f64>().with_context(|| format!("`{arg}` is not a number"))
}
