//! Chemical elements carried by the product species.

/// Elements known to the species catalog, in canonical (alphabetical) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    /// Argon
    Ar,
    /// Carbon
    C,
    /// Hydrogen
    H,
    /// Nitrogen
    N,
    /// Oxygen
    O,
}

impl Element {
    pub const ALL: [Element; 5] = [Element::Ar, Element::C, Element::H, Element::N, Element::O];

    pub fn symbol(&self) -> &'static str {
        match self {
            Element::Ar => "Ar",
            Element::C => "C",
            Element::H => "H",
            Element::N => "N",
            Element::O => "O",
        }
    }

    /// Standard atomic mass [g/mol].
    pub fn atomic_mass(&self) -> f64 {
        match self {
            Element::Ar => 39.948,
            Element::C => 12.011,
            Element::H => 1.008,
            Element::N => 14.007,
            Element::O => 15.999,
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for Element {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AR" | "ARGON" => Ok(Element::Ar),
            "C" | "CARBON" => Ok(Element::C),
            "H" | "HYDROGEN" => Ok(Element::H),
            "N" | "NITROGEN" => Ok(Element::N),
            "O" | "OXYGEN" => Ok(Element::O),
            _ => Err("unknown element"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_sorted() {
        let mut sorted = Element::ALL;
        sorted.sort();
        assert_eq!(sorted, Element::ALL);
    }

    #[test]
    fn parse_symbols_and_names() {
        assert_eq!("ar".parse::<Element>(), Ok(Element::Ar));
        assert_eq!("Oxygen".parse::<Element>(), Ok(Element::O));
        assert!("Xe".parse::<Element>().is_err());
    }
}
