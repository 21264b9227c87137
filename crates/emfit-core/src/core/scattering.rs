use phf::{Map, phf_map};

/// One-Gaussian electron scattering factor, `f(s) = A * exp(-B * s^2)`,
/// with `B` in Angstrom squared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringFactor {
    pub a: f64,
    pub b: f64,
}

static SCATTERING_FACTORS: Map<char, ScatteringFactor> = phf_map! {
    'C' => ScatteringFactor { a: 5.96792806111, b: 14.8957682987 },
    'O' => ScatteringFactor { a: 7.9652690671, b: 9.0526662027 },
    'N' => ScatteringFactor { a: 6.96715024214, b: 11.4372299305 },
    'S' => ScatteringFactor { a: 15.911119329, b: 10.8469011094 },
};

pub fn scattering_factor(element: char) -> Option<&'static ScatteringFactor> {
    SCATTERING_FACTORS.get(&element)
}

/// Element letter for an atom name: the first character of the name, unless
/// that is a digit (e.g. "1HB2"), in which case the second.
pub fn element_symbol(atom_name: &str) -> Option<char> {
    let mut chars = atom_name.trim().chars();
    let first = chars.next()?;
    if first.is_ascii_digit() {
        chars.next()
    } else {
        Some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_supported_elements() {
        for element in ['C', 'O', 'N', 'S'] {
            assert!(scattering_factor(element).is_some());
        }
        assert!(scattering_factor('H').is_none());
        assert!(scattering_factor('X').is_none());
    }

    #[test]
    fn carbon_constants_match_tabulated_values() {
        let carbon = scattering_factor('C').unwrap();
        assert_eq!(carbon.a, 5.96792806111);
        assert_eq!(carbon.b, 14.8957682987);
    }

    #[test]
    fn element_symbol_uses_first_letter_of_plain_names() {
        assert_eq!(element_symbol("CA"), Some('C'));
        assert_eq!(element_symbol("OXT"), Some('O'));
        assert_eq!(element_symbol(" SD "), Some('S'));
    }

    #[test]
    fn element_symbol_skips_a_leading_digit() {
        assert_eq!(element_symbol("1HB2"), Some('H'));
        assert_eq!(element_symbol("2CA"), Some('C'));
    }

    #[test]
    fn element_symbol_handles_degenerate_names() {
        assert_eq!(element_symbol(""), None);
        assert_eq!(element_symbol("1"), None);
    }
}
