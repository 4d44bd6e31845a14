// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parsing of manually supplied corners ("x,y;x,y;x,y;x,y").

use docscan_core::error::{DocscanError, Result};

/// Parse exactly four `x,y` pairs separated by `;`.
pub fn parse_corners(text: &str) -> Result<[(f64, f64); 4]> {
    let pairs: Vec<&str> = text.split(';').map(str::trim).filter(|s| !s.is_empty()).collect();
    if pairs.len() != 4 {
        return Err(DocscanError::InvalidConfig(format!(
            "expected 4 corners, got {}",
            pairs.len()
        )));
    }

    let mut corners = [(0.0, 0.0); 4];
    for (slot, pair) in corners.iter_mut().zip(&pairs) {
        let (x, y) = pair
            .split_once(',')
            .ok_or_else(|| DocscanError::InvalidConfig(format!("corner {pair:?} is not x,y")))?;
        *slot = (parse_coord(x)?, parse_coord(y)?);
    }
    Ok(corners)
}

fn parse_coord(text: &str) -> Result<f64> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| DocscanError::InvalidConfig(format!("{text:?} is not a number")))?;
    if !value.is_finite() {
        return Err(DocscanError::InvalidConfig(format!("{text:?} is not finite")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_pairs() {
        let corners = parse_corners("10,20; 300,25;310.5,400 ;5,390").unwrap();
        assert_eq!(corners, [(10.0, 20.0), (300.0, 25.0), (310.5, 400.0), (5.0, 390.0)]);
    }

    #[test]
    fn rejects_wrong_count_and_garbage() {
        assert!(parse_corners("1,2;3,4;5,6").is_err());
        assert!(parse_corners("1,2;3,4;5,6;7").is_err());
        assert!(parse_corners("1,2;3,4;5,6;x,8").is_err());
        assert!(parse_corners("1,2;3,4;5,6;inf,8").is_err());
    }
}
