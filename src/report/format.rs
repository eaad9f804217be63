//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (and covered by exact-string tests)

use crate::domain::{FitResult, Observation};
use crate::io::ingest::IngestedData;
use crate::models::bounce::BounceProfile;
use crate::models::{decay, tunnelling};

/// Format `v` to `sig` significant figures, `%g`-style.
///
/// Fixed notation when the decimal exponent is in `[-4, sig)`, scientific
/// (`1.2e-05`) otherwise; trailing zeros are removed in both cases.
pub fn fmt_sig(v: f64, sig: usize) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }

    let sig = sig.max(1);
    // Rounding first tells us the exponent after carry (9.995 -> 1.00e1).
    let sci = format!("{:.*e}", sig - 1, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= sig as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", strip_zeros(mantissa), exp.abs())
    } else {
        let decimals = (sig as i32 - 1 - exp).max(0) as usize;
        strip_zeros(&format!("{v:.decimals$}")).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Plain number formatting that keeps a `.0` on whole values (`10.0`, `0.1`).
pub fn fmt_plain(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Rows read / used / discarded and the value range of a fitted dataset.
pub fn format_data_summary(ingest: &IngestedData) -> String {
    let mut out = String::new();
    let files: Vec<String> = ingest.sources.iter().map(|p| p.display().to_string()).collect();
    out.push_str(&format!("Data: {}\n", files.join(", ")));
    out.push_str(&format!(
        "Rows: read={} used={} invalid={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    let stats = &ingest.stats;
    out.push_str(&format!(
        "Range: x=[{}, {}] y=[{}, {}] over {} points\n",
        fmt_sig(stats.x_min, 4),
        fmt_sig(stats.x_max, 4),
        fmt_sig(stats.y_min, 4),
        fmt_sig(stats.y_max, 4),
        stats.n_points
    ));
    out
}

/// Outlier count line, empty when nothing was rejected.
pub fn format_rejected(rejected: &[Observation]) -> String {
    match rejected.len() {
        0 => String::new(),
        1 => "1 outlier (> 3σ from the first fit) was removed before refitting.\n".to_string(),
        n => format!("{n} outliers (> 3σ from the first fit) were removed before refitting.\n"),
    }
}

/// Thickness, layer count and fit quality for the tunnelling exercise.
pub fn format_tunnelling_report(fit: &FitResult) -> String {
    let d = fit.params[0];
    let err = fit.errors[0];
    let mut out = String::new();

    out.push_str(&format!(
        "The fitted value for the thickness d of Boron nitride is {d:.3} \u{212B}\n"
    ));
    if err.is_finite() {
        out.push_str(&format!("The uncertainty on d is \u{00B1} {} \u{212B}.\n", fmt_sig(err, 2)));
    } else {
        out.push_str("The uncertainty on d could not be estimated.\n");
    }
    out.push_str(&format!("This is {:.3} layers thick.\n", tunnelling::layer_count(d)));
    out.push_str(&format!(
        "The reduced chi squared for this line is {:.2}.\n",
        fit.quality.reduced_chi2
    ));
    out
}

/// Decay constants, half-lives and fit quality for the decay exercise.
pub fn format_decay_report(fit: &FitResult) -> String {
    let [rb, sr] = [fit.params[0], fit.params[1]];
    let [rb_err, sr_err] = [fit.errors[0], fit.errors[1]];
    let minutes = decay::SECONDS_PER_MINUTE;
    let mut out = String::new();

    out.push_str(&format!(
        "The decay constant for Rubidium is {} \u{00B1} {} s\u{207B}\u{00B9}.\n",
        fmt_sig(rb, 3),
        fmt_sig(rb_err, 2)
    ));
    out.push_str(&format!(
        "The decay constant for Strontium is {} \u{00B1} {} s\u{207B}\u{00B9}.\n",
        fmt_sig(sr, 3),
        fmt_sig(sr_err, 2)
    ));
    out.push_str(&format!(
        "The half life of Rubidium is {} \u{00B1} {} minutes.\n",
        fmt_sig(decay::half_life(rb) / minutes, 3),
        fmt_sig(decay::half_life_error(rb, rb_err) / minutes, 2)
    ));
    out.push_str(&format!(
        "The half life of Strontium is {} \u{00B1} {} minutes.\n",
        fmt_sig(decay::half_life(sr) / minutes, 3),
        fmt_sig(decay::half_life_error(sr, sr_err) / minutes, 1)
    ));
    out.push_str(&format!(
        "The reduced chi squared for the minimised chi squared line is {:.2}.\n",
        fit.quality.reduced_chi2
    ));
    out
}

/// One-sentence bounce summary.
pub fn format_bounce_report(profile: &BounceProfile) -> String {
    let noun = if profile.count == 1 { "bounce" } else { "bounces" };
    let span = format!(
        "between {} m and {} m",
        fmt_plain(profile.initial_height),
        fmt_plain(profile.minimum_height)
    );
    if profile.count == 0 {
        format!("The ball makes 0 complete bounces {span}.\n")
    } else {
        format!(
            "The ball makes {} complete {noun} {span} in {:.2} seconds.\n",
            profile.count, profile.total_time
        )
    }
}

/// Apex height of every complete bounce, one per line.
pub fn format_bounce_heights(profile: &BounceProfile) -> String {
    profile.heights().map(|h| format!("{h:.2}m\n")).collect()
}
