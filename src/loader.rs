use crate::city::City;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Reads a cities file: the city count on the first line, then one `x y`
/// (or `x,y`) pair per line. Blank lines are skipped.
pub fn load_cities(path: impl AsRef<Path>) -> Result<Vec<City>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_cities(&text)
}

pub fn parse_cities(text: &str) -> Result<Vec<City>> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (count_line, count) = lines.next().ok_or(Error::Parse {
        line: 1,
        reason: "missing city count".to_string(),
    })?;
    let count: usize = count.parse().map_err(|_| Error::Parse {
        line: count_line,
        reason: format!("invalid city count {count:?}"),
    })?;

    let mut cities = Vec::with_capacity(count);
    for index in 0..count {
        let (line, content) = lines.next().ok_or_else(|| Error::Parse {
            line: text.lines().count() + 1,
            reason: format!("expected {count} cities, found {index}"),
        })?;

        let mut fields = content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|field| !field.is_empty());
        let x = coordinate(fields.next(), line, "x")?;
        let y = coordinate(fields.next(), line, "y")?;
        let id = i32::try_from(index).map_err(|_| Error::Parse {
            line,
            reason: "too many cities".to_string(),
        })?;

        cities.push(City::new(x, y, id));
    }

    if cities.is_empty() {
        return Err(Error::NoCities);
    }

    Ok(cities)
}

fn coordinate(field: Option<&str>, line: usize, axis: &str) -> Result<f64> {
    let field = field.ok_or_else(|| Error::Parse {
        line,
        reason: format!("missing {axis} coordinate"),
    })?;
    field.parse().map_err(|_| Error::Parse {
        line,
        reason: format!("invalid {axis} coordinate {field:?}"),
    })
}
