//! The 21 official districts of the city of Madrid.
//!
//! Every collector keys its per-district constants on [`District`] and writes
//! the official name (accents and hyphens included) into the `distrito` column.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum District {
    Centro,
    Arganzuela,
    Retiro,
    Salamanca,
    Chamartin,
    Tetuan,
    Chamberi,
    FuencarralElPardo,
    MoncloaAravaca,
    Latina,
    Carabanchel,
    Usera,
    PuenteDeVallecas,
    Moratalaz,
    CiudadLineal,
    Hortaleza,
    Villaverde,
    VillaDeVallecas,
    Vicalvaro,
    SanBlasCanillejas,
    Barajas,
}

impl District {
    pub const ALL: [District; 21] = [
        District::Centro,
        District::Arganzuela,
        District::Retiro,
        District::Salamanca,
        District::Chamartin,
        District::Tetuan,
        District::Chamberi,
        District::FuencarralElPardo,
        District::MoncloaAravaca,
        District::Latina,
        District::Carabanchel,
        District::Usera,
        District::PuenteDeVallecas,
        District::Moratalaz,
        District::CiudadLineal,
        District::Hortaleza,
        District::Villaverde,
        District::VillaDeVallecas,
        District::Vicalvaro,
        District::SanBlasCanillejas,
        District::Barajas,
    ];

    pub fn all() -> impl Iterator<Item = District> {
        Self::ALL.into_iter()
    }

    pub fn name(self) -> &'static str {
        match self {
            District::Centro => "Centro",
            District::Arganzuela => "Arganzuela",
            District::Retiro => "Retiro",
            District::Salamanca => "Salamanca",
            District::Chamartin => "Chamartín",
            District::Tetuan => "Tetuán",
            District::Chamberi => "Chamberí",
            District::FuencarralElPardo => "Fuencarral-El Pardo",
            District::MoncloaAravaca => "Moncloa-Aravaca",
            District::Latina => "Latina",
            District::Carabanchel => "Carabanchel",
            District::Usera => "Usera",
            District::PuenteDeVallecas => "Puente de Vallecas",
            District::Moratalaz => "Moratalaz",
            District::CiudadLineal => "Ciudad Lineal",
            District::Hortaleza => "Hortaleza",
            District::Villaverde => "Villaverde",
            District::VillaDeVallecas => "Villa de Vallecas",
            District::Vicalvaro => "Vicálvaro",
            District::SanBlasCanillejas => "San Blas-Canillejas",
            District::Barajas => "Barajas",
        }
    }

    /// 1-based official district number.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|d| *d == self).unwrap_or(0) + 1
    }

    /// Two-digit official code, `"01"`..`"21"`.
    pub fn number(self) -> String {
        format!("{:02}", self.index())
    }

    pub fn from_number(code: &str) -> Option<District> {
        let n: usize = code.trim().parse().ok()?;
        if (1..=Self::ALL.len()).contains(&n) {
            Some(Self::ALL[n - 1])
        } else {
            None
        }
    }

    /// Resolves a free-form district reference.
    ///
    /// Tries, in order: the exact official name, a numeric code, a
    /// case-insensitive match and finally an accent-insensitive match that
    /// treats spaces and hyphens alike (`"san blas canillejas"`).
    pub fn normalize(input: &str) -> Option<District> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(d) = Self::all().find(|d| d.name() == trimmed) {
            return Some(d);
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Self::from_number(trimmed);
        }
        let lower = trimmed.to_lowercase();
        if let Some(d) = Self::all().find(|d| d.name().to_lowercase() == lower) {
            return Some(d);
        }
        let loose = loose_key(trimmed);
        Self::all().find(|d| loose_key(d.name()) == loose)
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn loose_key(s: &str) -> String {
    normalize_text(&s.replace('-', " "))
}

/// Replaces Spanish diacritics with their base letter.
pub fn strip_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Accent-free, lowercase, single-spaced text with spaces turned into `_`.
pub fn normalize_text(s: &str) -> String {
    strip_accents(s)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    mod succeeds {
        use super::*;

        #[test]
        fn test_all_has_21_districts_in_official_order() {
            assert_eq!(District::ALL.len(), 21);
            assert_eq!(District::ALL[0], District::Centro);
            assert_eq!(District::ALL[20], District::Barajas);
            assert_eq!(District::Barajas.number(), "21");
        }

        #[test]
        fn test_from_number_accepts_padded_and_unpadded() {
            assert_eq!(District::from_number("01"), Some(District::Centro));
            assert_eq!(District::from_number("7"), Some(District::Chamberi));
            assert_eq!(District::from_number("21"), Some(District::Barajas));
        }

        #[test]
        fn test_normalize_exact_and_number() {
            assert_eq!(District::normalize("Tetuán"), Some(District::Tetuan));
            assert_eq!(District::normalize("13"), Some(District::PuenteDeVallecas));
        }

        #[test]
        fn test_normalize_case_and_accent_insensitive() {
            assert_eq!(District::normalize("CHAMARTÍN"), Some(District::Chamartin));
            assert_eq!(District::normalize("chamberi"), Some(District::Chamberi));
            assert_eq!(
                District::normalize("san blas canillejas"),
                Some(District::SanBlasCanillejas)
            );
            assert_eq!(
                District::normalize("Fuencarral El Pardo"),
                Some(District::FuencarralElPardo)
            );
        }

        #[test]
        fn test_normalize_text() {
            assert_eq!(normalize_text("  Percentil 50 de  Consumo "), "percentil_50_de_consumo");
            assert_eq!(normalize_text("Vicálvaro"), "vicalvaro");
        }

        #[test]
        fn test_display_uses_official_name() {
            assert_eq!(District::VillaDeVallecas.to_string(), "Villa de Vallecas");
        }
    }

    mod fails {
        use super::*;

        #[test]
        fn test_from_number_out_of_range() {
            assert_eq!(District::from_number("0"), None);
            assert_eq!(District::from_number("22"), None);
            assert_eq!(District::from_number("x"), None);
        }

        #[test]
        fn test_normalize_unknown() {
            assert_eq!(District::normalize("Gotham"), None);
            assert_eq!(District::normalize(""), None);
            assert_eq!(District::normalize("Alcobendas"), None);
        }
    }
}
