use std::io::Read;

use csv::{Reader, ReaderBuilder, StringRecord};
use ndarray::Array2;

use crate::classification::alias::FType;
use crate::common::ClassLabel;
use crate::error::StreamError;

/// Chunked reader for numeric CSV streams with a binary label column.
///
/// Every column except the named label column is treated as a feature;
/// records are grouped into chunks of `chunk_size` rows ready to feed to
/// `partial_fit`. The final chunk may be shorter. Parse failures and labels
/// outside {0, 1} surface as [`StreamError::InvalidInput`].
///
/// # Example
///
/// ```
/// use stream_bagging::stream::chunks::ChunkedCsv;
///
/// let content = "f1,f2,label\n0.1,0.2,0\n0.3,0.1,0\n0.9,0.8,1\n0.7,0.9,1\n";
/// let mut chunks = ChunkedCsv::<f64, _>::new(content.as_bytes(), "label", 2).unwrap();
///
/// let (x, y) = chunks.next().unwrap().unwrap();
/// assert_eq!(x.shape(), &[2, 2]);
/// assert_eq!(y, vec![0, 0]);
/// ```
pub struct ChunkedCsv<F: FType, R: Read> {
    reader: Reader<R>,
    label_index: usize,
    chunk_size: usize,
    marker: std::marker::PhantomData<F>,
}

impl<F: FType, R: Read> ChunkedCsv<F, R> {
    pub fn new(reader: R, label_column: &str, chunk_size: usize) -> Result<Self, StreamError> {
        assert!(chunk_size > 0, "chunk_size must be positive");
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|e| StreamError::InvalidInput(format!("cannot read CSV headers: {e}")))?;
        let label_index = headers
            .iter()
            .position(|name| name == label_column)
            .ok_or_else(|| {
                StreamError::InvalidInput(format!("label column '{label_column}' not found"))
            })?;
        Ok(ChunkedCsv {
            reader,
            label_index,
            chunk_size,
            marker: std::marker::PhantomData,
        })
    }

    fn parse_record(&self, record: &StringRecord) -> Result<(Vec<F>, ClassLabel), StreamError> {
        let mut features = Vec::with_capacity(record.len().saturating_sub(1));
        let mut label = None;
        for (index, field) in record.iter().enumerate() {
            if index == self.label_index {
                label = Some(match field.trim() {
                    "0" => 0,
                    "1" => 1,
                    other => {
                        return Err(StreamError::InvalidInput(format!(
                            "label '{other}' is not in the binary set {{0, 1}}"
                        )))
                    }
                });
            } else {
                let value: f64 = field.trim().parse().map_err(|_| {
                    StreamError::InvalidInput(format!("feature value '{field}' is not numeric"))
                })?;
                features.push(F::from_f64(value).unwrap());
            }
        }
        // A record with no label field can only come from a ragged CSV row.
        let label =
            label.ok_or_else(|| StreamError::InvalidInput("record misses label field".into()))?;
        Ok((features, label))
    }
}

impl<F: FType, R: Read> Iterator for ChunkedCsv<F, R> {
    type Item = Result<(Array2<F>, Vec<ClassLabel>), StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut flat: Vec<F> = Vec::new();
        let mut labels = Vec::with_capacity(self.chunk_size);
        let mut n_features = 0;

        let mut record = StringRecord::new();
        while labels.len() < self.chunk_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    return Some(Err(StreamError::InvalidInput(format!(
                        "malformed CSV record: {e}"
                    ))))
                }
            }
            let (features, label) = match self.parse_record(&record) {
                Ok(parsed) => parsed,
                Err(e) => return Some(Err(e)),
            };
            if labels.is_empty() {
                n_features = features.len();
            } else if features.len() != n_features {
                return Some(Err(StreamError::InvalidInput(
                    "ragged CSV: records have differing widths".into(),
                )));
            }
            flat.extend(features);
            labels.push(label);
        }

        if labels.is_empty() {
            return None;
        }
        let x = Array2::from_shape_vec((labels.len(), n_features), flat).unwrap();
        Some(Ok((x, labels)))
    }
}
