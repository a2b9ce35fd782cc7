// Compact view count: 999, 12.3K, 4.56M, 1.20B
pub fn format_views(views: f64) -> String {
    const K: f64 = 1_000.0;
    const M: f64 = 1_000.0 * K;
    const B: f64 = 1_000.0 * M;

    let abs = views.abs();
    if abs >= B {
        format!("{:.2}B", views / B)
    } else if abs >= M {
        format!("{:.2}M", views / M)
    } else if abs >= K {
        format!("{:.1}K", views / K)
    } else {
        format!("{:.0}", views)
    }
}

pub fn format_rate(rate: f64) -> String {
    if rate.abs() >= 1_000.0 {
        format!("{}/min", format_views(rate))
    } else {
        format!("{:.1}/min", rate)
    }
}

pub fn format_optional_rate(rate: Option<f64>) -> String {
    rate.map(format_rate).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_scale_with_suffixes() {
        assert_eq!(format_views(999.0), "999");
        assert_eq!(format_views(12_345.0), "12.3K");
        assert_eq!(format_views(4_560_000.0), "4.56M");
        assert_eq!(format_views(1_200_000_000.0), "1.20B");
    }

    #[test]
    fn rates_keep_their_sign() {
        assert_eq!(format_rate(500.0), "500.0/min");
        assert_eq!(format_rate(-2_500.0), "-2.5K/min");
        assert_eq!(format_optional_rate(None), "-");
    }
}
