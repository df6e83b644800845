//! 终端报告.

use std::io::{self, Write};

use cord_metrics::prelude::MetricResult;

/// 将一次计算的结果写进 `w` 中. 未定义的指标显示为 `/`.
pub fn describe_into<W: Write>(
    subject: &str,
    r: &MetricResult,
    sharpness: Option<f64>,
    w: &mut W,
) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Subject `{subject}`:")?;
    writeln!(w, "{S4}SNR (single): {}", f64_to_display(Some(r.snr_single)))?;
    writeln!(w, "{S4}SNR (diff): {}", f64_to_display(r.snr_diff))?;
    writeln!(w, "{S4}Contrast: {} %", f64_to_display(Some(r.contrast)))?;
    writeln!(w, "{S4}CNR (single): {}", f64_to_display(Some(r.cnr_single)))?;
    writeln!(w, "{S4}CNR (diff): {}", f64_to_display(r.cnr_diff))?;
    writeln!(
        w,
        "{S4}CNR per unit time (single): {}",
        f64_to_display(r.cnr_single_per_time)
    )?;
    writeln!(
        w,
        "{S4}CNR per unit time (diff): {}",
        f64_to_display(r.cnr_diff_per_time)
    )?;
    write!(w, "{S4}Sharpness: {}", f64_to_display(sharpness))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_values_are_slashes() {
        let r = MetricResult {
            snr_single: 10.0,
            snr_diff: None,
            contrast: 20.0,
            cnr_single: 2.5,
            cnr_diff: None,
            cnr_single_per_time: Some(0.5),
            cnr_diff_per_time: None,
        };
        let mut buf = Vec::new();
        describe_into("sub-01", &r, None, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "Subject `sub-01`:");
        assert_eq!(lines[1], "    SNR (single): 10.000000");
        assert_eq!(lines[2], "    SNR (diff): /");
        assert_eq!(lines[6], "    CNR per unit time (single): 0.500000");
        assert_eq!(lines[8], "    Sharpness: /");
    }
}
