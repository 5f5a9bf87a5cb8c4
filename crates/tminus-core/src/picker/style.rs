/// Opacity tier of a wheel row. Ordered from faintest to fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Opacity {
    Low,
    Medium,
    High,
    Full,
}

impl Opacity {
    pub fn value(self) -> f32 {
        match self {
            Opacity::Low => 0.2,
            Opacity::Medium => 0.4,
            Opacity::High => 0.7,
            Opacity::Full => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scale {
    Reduced,
    Enlarged,
}

impl Scale {
    pub fn factor(self) -> f32 {
        match self {
            Scale::Reduced => 0.95,
            Scale::Enlarged => 1.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStyle {
    pub opacity: Opacity,
    pub scale: Scale,
    /// Centered rows are drawn bold.
    pub centered: bool,
}

/// Visual weight of the row at `index` while `highlighted` sits in the
/// center of the viewport.
pub fn style(index: usize, highlighted: usize) -> ItemStyle {
    let distance = index.abs_diff(highlighted);

    let opacity = match distance {
        0 => Opacity::Full,
        1 => Opacity::High,
        2 => Opacity::Medium,
        _ => Opacity::Low,
    };
    let scale = if distance == 0 {
        Scale::Enlarged
    } else {
        Scale::Reduced
    };

    ItemStyle {
        opacity,
        scale,
        centered: distance == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{Opacity, Scale, style};

    #[test]
    fn distance_table() {
        let cases = [
            (0, Opacity::Full, Scale::Enlarged, true),
            (1, Opacity::High, Scale::Reduced, false),
            (2, Opacity::Medium, Scale::Reduced, false),
            (3, Opacity::Low, Scale::Reduced, false),
            (9, Opacity::Low, Scale::Reduced, false),
        ];

        for (distance, opacity, scale, centered) in cases {
            let got = style(10 + distance, 10);
            assert_eq!(got.opacity, opacity, "distance {distance}");
            assert_eq!(got.scale, scale, "distance {distance}");
            assert_eq!(got.centered, centered, "distance {distance}");
            assert_eq!(style(10 - distance, 10), got, "symmetric at {distance}");
        }
    }

    #[test]
    fn centered_row_is_the_maximum_and_tiers_never_rise() {
        for highlighted in 0..40 {
            let centered = style(highlighted, highlighted);
            let mut previous = centered.opacity;
            for index in highlighted..highlighted + 8 {
                let current = style(index, highlighted).opacity;
                assert!(current <= centered.opacity);
                assert!(current <= previous);
                previous = current;
            }
        }
    }

    #[test]
    fn tier_values_follow_ordering() {
        assert!(Opacity::Low.value() < Opacity::Medium.value());
        assert!(Opacity::Medium.value() < Opacity::High.value());
        assert!(Opacity::High.value() < Opacity::Full.value());
        assert!(Scale::Reduced.factor() < Scale::Enlarged.factor());
    }
}
