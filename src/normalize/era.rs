//! Japanese imperial eras (wareki) and their conversion to Gregorian years.

/// An imperial era recognized in review sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Era {
    Meiji,
    Taisho,
    Showa,
    Heisei,
    Reiwa,
}

impl Era {
    pub const ALL: [Era; 5] = [Era::Meiji, Era::Taisho, Era::Showa, Era::Heisei, Era::Reiwa];

    pub fn as_kanji(&self) -> &'static str {
        match self {
            Self::Meiji => "明治",
            Self::Taisho => "大正",
            Self::Showa => "昭和",
            Self::Heisei => "平成",
            Self::Reiwa => "令和",
        }
    }

    /// Single-letter abbreviation. Only the two recent eras are written this
    /// way in the sheets; `M`, `T` and `S` show up as sizes and model codes.
    pub fn as_letter(&self) -> Option<char> {
        match self {
            Self::Heisei => Some('H'),
            Self::Reiwa => Some('R'),
            _ => None,
        }
    }

    /// Gregorian year of era-year 0, so year N of the era is `base + N`.
    pub fn base_year(&self) -> i32 {
        match self {
            Self::Meiji => 1867,
            Self::Taisho => 1911,
            Self::Showa => 1925,
            Self::Heisei => 1988,
            Self::Reiwa => 2018,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        };
        Self::ALL
            .iter()
            .copied()
            .find(|era| era.as_kanji() == token || (letter.is_some() && letter == era.as_letter()))
    }
}

/// Regex alternation matching any era token, kanji forms first.
pub fn era_token_pattern() -> String {
    let kanji = Era::ALL.iter().map(|e| e.as_kanji().to_string());
    let letters = Era::ALL.iter().filter_map(|e| e.as_letter()).map(|c| c.to_string());
    format!("(?:{})", kanji.chain(letters).collect::<Vec<_>>().join("|"))
}

/// Parse an in-era year: "元" or one to two ASCII digits, never zero.
pub fn parse_era_year(token: &str) -> Option<i32> {
    if token == "元" {
        return Some(1);
    }
    if token.is_empty() || token.len() > 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match token.parse::<i32>() {
        Ok(0) | Err(_) => None,
        Ok(year) => Some(year),
    }
}

/// Convert an era token and in-era year token to a Gregorian year.
///
/// Returns `None` when either token is not recognized; callers leave the
/// source text as it was.
pub fn to_gregorian(era_token: &str, year_token: &str) -> Option<i32> {
    let era = Era::from_token(era_token)?;
    let year = parse_era_year(year_token)?;
    Some(era.base_year() + year)
}
