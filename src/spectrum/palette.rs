use serde::Deserialize;

use crate::error::{Result, SpectrogramError};

pub type Rgb = [u8; 3];

/// A colour keyed at one intensity of a discrete-stop palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct ColorStop {
    pub at: u8,
    pub color: Rgb,
}

/// Intensity → colour mapping.
///
/// The four named schemes are cheap closed-form approximations; `Viridis` and
/// `Magma` intentionally do not reproduce the reference colour maps.
#[derive(Clone, Debug)]
pub enum Palette {
    Grayscale,
    Heated,
    Viridis,
    Magma,
    /// Piecewise-linear between sorted stops, flat beyond the outer stops.
    Stops(Vec<ColorStop>),
    /// A user mapping, identified by `name` when palettes are compared.
    Custom { name: String, map: fn(u8) -> Rgb },
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Palette::Grayscale, Palette::Grayscale)
            | (Palette::Heated, Palette::Heated)
            | (Palette::Viridis, Palette::Viridis)
            | (Palette::Magma, Palette::Magma) => true,
            (Palette::Stops(a), Palette::Stops(b)) => a == b,
            // Function pointer addresses are not stable, so only names count.
            (Palette::Custom { name: a, .. }, Palette::Custom { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Palette {
    pub fn custom(name: impl Into<String>, map: fn(u8) -> Rgb) -> Self {
        Palette::Custom {
            name: name.into(),
            map,
        }
    }

    pub fn from_stops(mut stops: Vec<ColorStop>) -> Result<Self> {
        if stops.is_empty() {
            return Err(SpectrogramError::InvalidConfig(
                "palette needs at least one colour stop".into(),
            ));
        }
        stops.sort_by_key(|s| s.at);
        if stops.windows(2).any(|w| w[0].at == w[1].at) {
            return Err(SpectrogramError::InvalidConfig(
                "palette has two stops at the same intensity".into(),
            ));
        }
        Ok(Palette::Stops(stops))
    }

    pub fn color_of(&self, intensity: u8) -> Rgb {
        let v = intensity as f32;
        match self {
            Palette::Grayscale => [intensity, intensity, intensity],
            Palette::Heated => rgb(
                (v * 2.0).min(255.0),
                (v - 128.0).max(0.0) * 2.0,
                (v - 192.0).max(0.0) * 4.0,
            ),
            Palette::Viridis => rgb(v, (v * 1.5).min(255.0), (255.0 - v).max(0.0)),
            Palette::Magma => rgb((v * 2.0).min(255.0), (v - 64.0).max(0.0), (v * 1.5).min(255.0)),
            Palette::Stops(stops) => interpolate_stops(stops, intensity),
            Palette::Custom { map, .. } => map(intensity),
        }
    }

    /// Colour for every intensity, indexed by intensity.
    pub fn table(&self) -> [Rgb; 256] {
        let mut table = [[0u8; 3]; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = self.color_of(i as u8);
        }
        table
    }
}

fn channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn rgb(r: f32, g: f32, b: f32) -> Rgb {
    [channel(r), channel(g), channel(b)]
}

fn interpolate_stops(stops: &[ColorStop], intensity: u8) -> Rgb {
    let upper = stops.partition_point(|s| s.at <= intensity);
    if upper == 0 {
        return stops[0].color;
    }
    if upper == stops.len() {
        return stops[stops.len() - 1].color;
    }

    let a = stops[upper - 1];
    let b = stops[upper];
    let t = (intensity - a.at) as f32 / (b.at - a.at) as f32;
    let lerp = |i: usize| a.color[i] as f32 + (b.color[i] as f32 - a.color[i] as f32) * t;
    rgb(lerp(0), lerp(1), lerp(2))
}

/// Name → palette lookup, seeded with the built-in schemes.
#[derive(Clone, Debug)]
pub struct PaletteRegistry {
    entries: Vec<(String, Palette)>,
}

impl Default for PaletteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteRegistry {
    pub fn new() -> Self {
        Self {
            entries: vec![
                ("grayscale".into(), Palette::Grayscale),
                ("heated".into(), Palette::Heated),
                ("viridis".into(), Palette::Viridis),
                ("magma".into(), Palette::Magma),
            ],
        }
    }

    /// Add or replace a palette. Names are case-insensitive.
    pub fn register(&mut self, name: &str, palette: Palette) -> Result<()> {
        let key = name.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(SpectrogramError::InvalidConfig("palette name is empty".into()));
        }
        match self.entries.iter_mut().find(|(n, _)| *n == key) {
            Some(entry) => entry.1 = palette,
            None => self.entries.push((key, palette)),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Palette> {
        let key = name.trim().to_ascii_lowercase();
        // "gray" is accepted alongside the canonical spelling.
        let key = if key == "gray" || key == "greyscale" { "grayscale".to_string() } else { key };
        self.entries
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| SpectrogramError::UnknownPalette(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_endpoints() {
        assert_eq!(Palette::Grayscale.color_of(0), [0, 0, 0]);
        assert_eq!(Palette::Grayscale.color_of(255), [255, 255, 255]);
    }

    #[test]
    fn heated_ramps_red_then_green_then_blue() {
        let p = Palette::Heated;
        assert_eq!(p.color_of(0), [0, 0, 0]);
        assert_eq!(p.color_of(100), [200, 0, 0]);
        assert_eq!(p.color_of(160), [255, 64, 0]);
        assert_eq!(p.color_of(255), [255, 254, 252]);
    }

    #[test]
    fn viridis_and_magma_follow_their_formulas() {
        assert_eq!(Palette::Viridis.color_of(0), [0, 0, 255]);
        assert_eq!(Palette::Viridis.color_of(100), [100, 150, 155]);
        assert_eq!(Palette::Viridis.color_of(255), [255, 255, 0]);
        assert_eq!(Palette::Magma.color_of(0), [0, 0, 0]);
        assert_eq!(Palette::Magma.color_of(100), [200, 36, 150]);
        assert_eq!(Palette::Magma.color_of(255), [255, 191, 255]);
    }

    #[test]
    fn stops_interpolate_and_hold_at_the_ends() {
        let palette = Palette::from_stops(vec![
            ColorStop { at: 200, color: [255, 255, 255] },
            ColorStop { at: 100, color: [0, 0, 0] },
        ])
        .unwrap();
        assert_eq!(palette.color_of(0), [0, 0, 0]);
        assert_eq!(palette.color_of(150), [128, 128, 128]);
        assert_eq!(palette.color_of(250), [255, 255, 255]);
    }

    #[test]
    fn stops_reject_duplicates_and_empty() {
        assert!(Palette::from_stops(Vec::new()).is_err());
        let dup = vec![
            ColorStop { at: 10, color: [0, 0, 0] },
            ColorStop { at: 10, color: [1, 1, 1] },
        ];
        assert!(Palette::from_stops(dup).is_err());
    }

    #[test]
    fn table_matches_color_of() {
        let table = Palette::Magma.table();
        for v in 0..=255u8 {
            assert_eq!(table[v as usize], Palette::Magma.color_of(v));
        }
    }

    #[test]
    fn registry_resolves_builtins_and_custom_entries() {
        let mut registry = PaletteRegistry::new();
        assert_eq!(registry.get("Heated").unwrap(), Palette::Heated);
        assert_eq!(registry.get("gray").unwrap(), Palette::Grayscale);
        assert!(matches!(
            registry.get("jet"),
            Err(SpectrogramError::UnknownPalette(_))
        ));

        fn inverted(v: u8) -> Rgb {
            [255 - v, 255 - v, 255 - v]
        }
        registry.register("Inverted", Palette::custom("inverted", inverted)).unwrap();
        assert_eq!(registry.get("inverted").unwrap().color_of(0), [255, 255, 255]);
        assert_eq!(registry.names().count(), 5);
    }

    #[test]
    fn custom_palettes_compare_by_name() {
        fn inverted(v: u8) -> Rgb {
            [255 - v, 255 - v, 255 - v]
        }
        fn red(v: u8) -> Rgb {
            [v, 0, 0]
        }
        let a = Palette::custom("inverted", inverted);
        assert_eq!(a, a.clone());
        assert_eq!(a, Palette::custom("inverted", inverted));
        assert_ne!(a, Palette::custom("red", red));
        assert_ne!(a, Palette::Grayscale);
        assert_eq!(
            Palette::from_stops(vec![ColorStop { at: 0, color: [1, 2, 3] }]).unwrap(),
            Palette::from_stops(vec![ColorStop { at: 0, color: [1, 2, 3] }]).unwrap()
        );
    }
}
