use std::fs;

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till};
use nom::character::complete::{i32 as int32, i64 as int64, multispace1, space1};
use nom::multi::many1;
use nom::number::complete::double;
use nom::sequence::preceded;

use crate::geometry::Coord;
use crate::layout::{Config, LayoutDb, MplError};

/** A layout read from the line-oriented text form.

The format has one record per line:
 - `# ...` comment
 - `u <unit>` database unit in meter (defaults to 1e-9)
 - `s <layer> <x1> <y1> <x2> <y2> ...` one shape as a point list
*/
#[derive(Debug, Clone)]
pub struct TextLayout {
    /// database unit in meter
    pub unit: f64,
    /// shapes as (layer, points), in record order
    pub shapes: Vec<(i32, Vec<(Coord, Coord)>)>,
}

impl TextLayout {
    /** reads a layout from a text file */
    pub fn from_file(filename:&str) -> Result<Self, MplError> {
        let s = fs::read_to_string(filename)
            .map_err(|e| MplError::Io { path:filename.to_string(), source:e })?
            .replace('\r', "");
        parse_layout(&s).map_err(|msg| MplError::Parse { path:filename.to_string(), msg })
    }

    /** converts to an initialized layout database */
    pub fn into_db(self, config:Config) -> Result<LayoutDb, MplError> {
        let mut db = LayoutDb::new(config);
        db.set_unit(self.unit);
        for (i, (layer, points)) in self.shapes.iter().enumerate() {
            db.add(*layer, points).map_err(|e| match e {
                MplError::Ingest(msg) => MplError::Ingest(format!("record {}: {}", i, msg)),
                other => other,
            })?;
        }
        db.initialize();
        Ok(db)
    }
}

/// skips whitespace and `#` comment lines
fn skip_blank(s:&str) -> &str {
    let mut rest = s;
    loop {
        let step:IResult<&str,&str> = alt((
            multispace1,
            preceded(tag("#"), take_till(|c| c == '\n')),
        ))(rest);
        match step {
            Ok((remaining, _)) => { rest = remaining; }
            Err(_) => return rest,
        }
    }
}

/// reads a `u <unit>` record
fn read_unit(s:&str) -> IResult<&str, f64> {
    preceded(tag("u "), double)(s)
}

/// reads a `s <layer> <coords...>` record (coordinates stay flat here)
fn read_shape(s:&str) -> IResult<&str, (i32, Vec<Coord>)> {
    let (rest, _) = tag("s ")(s)?;
    let (rest, layer) = int32(rest)?;
    let (rest, coords) = many1(preceded(space1, int64))(rest)?;
    Ok((rest, (layer, coords)))
}

fn parse_layout(input:&str) -> Result<TextLayout, String> {
    let mut res = TextLayout { unit:1e-9, shapes:Vec::new() };
    let mut s = skip_blank(input);
    while !s.is_empty() {
        if let Ok((rest, unit)) = read_unit(s) {
            res.unit = unit;
            s = skip_blank(rest);
            continue;
        }
        match read_shape(s) {
            Ok((rest, (layer, coords))) => {
                if coords.len() % 2 != 0 {
                    return Err(format!(
                        "record {}: odd coordinate count {}", res.shapes.len(), coords.len()
                    ));
                }
                let points = coords.chunks(2).map(|c| (c[0], c[1])).collect();
                res.shapes.push((layer, points));
                s = skip_blank(rest);
            }
            Err(_) => {
                let line:String = s.chars().take_while(|c| *c != '\n').take(40).collect();
                return Err(format!("unrecognized record near '{}'", line));
            }
        }
    }
    Ok(res)
}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE:&str = "\
# two squares within coloring distance
u 1e-9
s 1 0 0 5 0 5 5 0 5
s 1 12 0 17 0 17 5 12 5
";

    #[test]
    fn test_parse_layout() {
        let lay = parse_layout(SAMPLE).unwrap();
        assert_eq!(lay.unit, 1e-9);
        assert_eq!(lay.shapes.len(), 2);
        assert_eq!(lay.shapes[0].0, 1);
        assert_eq!(lay.shapes[0].1, vec![(0,0),(5,0),(5,5),(0,5)]);
    }

    #[test]
    fn test_read_unit() {
        assert_eq!(read_unit("u 0.001\n").unwrap().1, 0.001);
        assert!(read_unit("s 1 0 0").is_err());
    }

    #[test]
    fn test_read_shape_negative_coords() {
        let (_, (layer, coords)) = read_shape("s 2 -5 10 10 15\n").unwrap();
        assert_eq!(layer, 2);
        assert_eq!(coords, vec![-5,10,10,15]);
    }

    #[test]
    fn test_odd_coordinates_rejected() {
        assert!(parse_layout("s 1 0 0 5\n").is_err());
    }

    #[test]
    fn test_unrecognized_record() {
        let err = parse_layout("q nonsense\n").unwrap_err();
        assert!(err.contains("unrecognized"));
    }

    #[test]
    fn test_into_db() {
        let config = Config {
            uncolor_layers: [1].iter().cloned().collect(),
            coloring_distance_nm: 10.,
            ..Config::default()
        };
        let db = parse_layout(SAMPLE).unwrap().into_db(config).unwrap();
        assert_eq!(db.nb_patterns(), 2);
        assert_eq!(db.coloring_distance(), 10);
    }
}
