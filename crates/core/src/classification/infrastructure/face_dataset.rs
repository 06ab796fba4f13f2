use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use crate::registry::domain::model_trainer::TrainError;

/// One labelled face from the age/gender CSV.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceSample {
    pub age: f64,
    /// 0 = male, 1 = female.
    pub gender: i64,
    pub pixels: Vec<u8>,
}

/// The `age,ethnicity,gender,img_name,pixels` face dataset.
///
/// Columns are located by header name, so extra or reordered columns are
/// tolerated. `pixels` holds space-separated grayscale intensities in
/// row-major order.
#[derive(Clone, Debug, Default)]
pub struct FaceDataset {
    samples: Vec<FaceSample>,
}

struct Columns {
    age: usize,
    gender: usize,
    pixels: usize,
}

impl FaceDataset {
    pub fn load(path: &Path, expected_pixels: usize) -> Result<Self, TrainError> {
        let file = File::open(path).map_err(|e| TrainError::Dataset {
            path: path.to_path_buf(),
            source: e,
        })?;
        let dataset = Self::parse(BufReader::new(file), expected_pixels).map_err(|e| match e {
            TrainError::Dataset { source, .. } => TrainError::Dataset {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::info!(
            "Loaded {} samples from {}",
            dataset.len(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn parse<R: BufRead>(reader: R, expected_pixels: usize) -> Result<Self, TrainError> {
        let mut lines = reader.lines().enumerate();

        let columns = match lines.next() {
            Some((_, header)) => parse_header(&header.map_err(io_error)?)?,
            None => return Ok(Self::default()),
        };

        let mut samples = Vec::new();
        for (idx, line) in lines {
            let line = line.map_err(io_error)?;
            if line.trim().is_empty() {
                continue;
            }
            samples.push(parse_row(&line, idx + 1, &columns, expected_pixels)?);
        }

        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[FaceSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Design matrix for the given samples, scaled to `[0, 1]`.
    pub fn features<'a>(samples: impl IntoIterator<Item = &'a FaceSample>) -> Array2<f32> {
        let rows: Vec<&FaceSample> = samples.into_iter().collect();
        let cols = rows.first().map_or(0, |s| s.pixels.len());
        Array2::from_shape_fn((rows.len(), cols), |(r, c)| {
            f32::from(rows[r].pixels[c]) / 255.0
        })
    }
}

fn io_error(e: std::io::Error) -> TrainError {
    TrainError::Dataset {
        path: Default::default(),
        source: e,
    }
}

fn parse_header(header: &str) -> Result<Columns, TrainError> {
    let names = split_fields(header);
    let find = |name: &str| {
        names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| TrainError::Parse {
                line: 1,
                reason: format!("missing '{name}' column"),
            })
    };
    Ok(Columns {
        age: find("age")?,
        gender: find("gender")?,
        pixels: find("pixels")?,
    })
}

fn parse_row(
    line: &str,
    line_no: usize,
    columns: &Columns,
    expected_pixels: usize,
) -> Result<FaceSample, TrainError> {
    let fields = split_fields(line);
    let field = |idx: usize, name: &str| {
        fields.get(idx).map(String::as_str).ok_or_else(|| TrainError::Parse {
            line: line_no,
            reason: format!("missing '{name}' field"),
        })
    };
    let parse_err = |name: &str, value: &str| TrainError::Parse {
        line: line_no,
        reason: format!("invalid {name} '{value}'"),
    };

    let age_raw = field(columns.age, "age")?;
    let age: f64 = age_raw.parse().map_err(|_| parse_err("age", age_raw))?;
    if !age.is_finite() || age < 0.0 {
        return Err(parse_err("age", age_raw));
    }

    let gender_raw = field(columns.gender, "gender")?;
    let gender: i64 = gender_raw
        .parse()
        .map_err(|_| parse_err("gender", gender_raw))?;

    let pixels = field(columns.pixels, "pixels")?
        .split_whitespace()
        .map(|p| p.parse::<u8>().map_err(|_| parse_err("pixel", p)))
        .collect::<Result<Vec<u8>, _>>()?;
    if pixels.len() != expected_pixels {
        return Err(TrainError::ShapeMismatch {
            line: line_no,
            expected: expected_pixels,
            actual: pixels.len(),
        });
    }

    Ok(FaceSample {
        age,
        gender,
        pixels,
    })
}

/// Splits one CSV record. Quoted fields may hold commas and `""` escapes.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const HEADER: &str = "age,ethnicity,gender,img_name,pixels";

    fn parse(body: &str, pixels: usize) -> Result<FaceDataset, TrainError> {
        FaceDataset::parse(Cursor::new(format!("{HEADER}\n{body}")), pixels)
    }

    #[test]
    fn test_parses_rows() {
        let ds = parse("1,2,0,a.jpg,0 128 255 7\n34,0,1,b.jpg,\"1 2 3 4\"\n", 4).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds.samples()[0],
            FaceSample {
                age: 1.0,
                gender: 0,
                pixels: vec![0, 128, 255, 7],
            }
        );
        assert_eq!(ds.samples()[1].gender, 1);
        assert_eq!(ds.samples()[1].pixels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_quoted_field_may_contain_commas() {
        let ds = parse("25,0,1,\"smith, jane.jpg\",\"5 6\"\n", 2).unwrap();
        assert_eq!(ds.samples()[0].gender, 1);
        assert_eq!(ds.samples()[0].pixels, vec![5, 6]);
    }

    #[test]
    fn test_split_fields_handles_escaped_quotes() {
        assert_eq!(
            split_fields(r#"1,"say ""hi"", ok", 2 "#),
            vec!["1", r#"say "hi", ok"#, "2"]
        );
    }

    #[test]
    fn test_columns_found_by_name() {
        let csv = "pixels,gender,age\n9 9,1,60\n";
        let ds = FaceDataset::parse(Cursor::new(csv), 2).unwrap();
        assert_eq!(ds.samples()[0].age, 60.0);
        assert_eq!(ds.samples()[0].gender, 1);
    }

    #[test]
    fn test_skips_blank_lines() {
        let ds = parse("1,0,0,a.jpg,1 2\n\n", 2).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_empty_input_is_empty_dataset() {
        let ds = FaceDataset::parse(Cursor::new(""), 4).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn test_missing_column_is_parse_error() {
        let err = FaceDataset::parse(Cursor::new("age,pixels\n1,0\n"), 1).unwrap_err();
        assert!(matches!(err, TrainError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_wrong_pixel_count_is_shape_mismatch() {
        let err = parse("1,0,0,a.jpg,1 2 3\n", 4).unwrap_err();
        assert!(matches!(
            err,
            TrainError::ShapeMismatch {
                line: 2,
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_out_of_range_pixel_is_parse_error() {
        assert!(matches!(
            parse("1,0,0,a.jpg,1 300\n", 2),
            Err(TrainError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_negative_age_is_parse_error() {
        assert!(parse("-4,0,0,a.jpg,1 2\n", 2).is_err());
    }

    #[test]
    fn test_features_are_unit_scaled() {
        let ds = parse("1,0,0,a.jpg,0 255\n2,0,1,b.jpg,51 102\n", 2).unwrap();
        let x = FaceDataset::features(ds.samples().iter());
        assert_eq!(x.dim(), (2, 2));
        assert_eq!(x[[0, 1]], 1.0);
        assert!((x[[1, 0]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("none.csv");
        match FaceDataset::load(&path, 4) {
            Err(TrainError::Dataset { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected dataset error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("faces.csv");
        std::fs::write(&path, format!("{HEADER}\n5,1,1,x.jpg,1 2 3 4\n")).unwrap();
        assert_eq!(FaceDataset::load(&path, 4).unwrap().len(), 1);
    }
}
