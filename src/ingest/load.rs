use std::io::Read;

use tracing::info;

use crate::error::LoadError;
use crate::ingest::chunk::Batches;
use crate::ingest::columns::Projection;
use crate::ingest::record::ServiceRequest;
use crate::sink::RequestSink;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Rows per batch. Zero is treated as 1.
    pub chunk_size: usize,
    /// Emit a progress line whenever the running total is an exact multiple
    /// of this. With the default (= chunk size) that means after every
    /// full-size batch; a trailing remainder batch reports only in the
    /// final summary. Zero is treated as 1.
    pub report_every: u64,
}

/// Stream `source` into `sink` in batches of `opts.chunk_size` rows.
///
/// The header is validated against the declared column mapping before any
/// row is appended; each batch is projected, date-coerced, and appended in
/// source order. On success the return value is the total row count and
/// every source row was appended exactly once. A sink failure aborts the
/// run immediately; batches appended before the failure stay committed and
/// are not cleaned up. Re-running over the same source duplicates all rows:
/// the sink is append-only and the loader does not deduplicate.
pub async fn load<R, S>(source: R, sink: &mut S, opts: &LoadOptions) -> Result<u64, LoadError>
where
    R: Read + Send,
    S: RequestSink + ?Sized,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let projection = Projection::from_header(reader.headers()?)?;

    let report_every = opts.report_every.max(1);
    let mut batches = Batches::new(reader.into_records(), opts.chunk_size);
    let mut total: u64 = 0;

    while let Some(batch) = batches.next_batch()? {
        let rows: Vec<ServiceRequest> = batch.iter().map(|r| projection.project(r)).collect();
        sink.append(&rows).await?;
        total += rows.len() as u64;

        if total % report_every == 0 {
            info!(rows = total, "imported so far");
        }
    }

    info!(rows = total, "import complete");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use async_trait::async_trait;
    use std::fmt::Write as _;

    /// Records every appended batch.
    #[derive(Default)]
    struct VecSink {
        batches: Vec<Vec<ServiceRequest>>,
    }

    #[async_trait]
    impl RequestSink for VecSink {
        async fn append(&mut self, rows: &[ServiceRequest]) -> Result<(), SinkError> {
            self.batches.push(rows.to_vec());
            Ok(())
        }
    }

    /// Accepts `ok_batches` appends, then fails every subsequent one.
    struct FailingSink {
        ok_batches: usize,
        batches: Vec<Vec<ServiceRequest>>,
    }

    #[async_trait]
    impl RequestSink for FailingSink {
        async fn append(&mut self, rows: &[ServiceRequest]) -> Result<(), SinkError> {
            if self.batches.len() >= self.ok_batches {
                return Err(SinkError::Unavailable("connection lost".into()));
            }
            self.batches.push(rows.to_vec());
            Ok(())
        }
    }

    const HEADER: &str = "Created Date,Agency,Agency Name,Complaint Type,Descriptor,Incident Zip,Borough,Resolution Description\n";

    fn sample_csv(rows: usize) -> String {
        let mut s = String::from(HEADER);
        for i in 0..rows {
            writeln!(
                s,
                "01/0{}/2020 10:00:00 AM,NYPD,New York City Police Department,Noise,row{},10001,QUEENS,Resolved",
                i % 9 + 1,
                i
            )
            .unwrap();
        }
        s
    }

    fn opts(chunk_size: usize) -> LoadOptions {
        LoadOptions {
            chunk_size,
            report_every: chunk_size as u64,
        }
    }

    #[tokio::test]
    async fn partitions_rows_and_returns_the_total() {
        let mut sink = VecSink::default();
        let total = load(sample_csv(25).as_bytes(), &mut sink, &opts(10))
            .await
            .unwrap();
        assert_eq!(total, 25);
        let sizes: Vec<usize> = sink.batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn destination_order_matches_source_order() {
        let mut sink = VecSink::default();
        load(sample_csv(12).as_bytes(), &mut sink, &opts(5))
            .await
            .unwrap();
        let descriptors: Vec<&str> = sink
            .batches
            .iter()
            .flatten()
            .map(|r| r.descriptor.as_str())
            .collect();
        let expected: Vec<String> = (0..12).map(|i| format!("row{}", i)).collect();
        assert_eq!(descriptors, expected);
    }

    #[tokio::test]
    async fn missing_column_appends_nothing() {
        let csv = "Created Date,Agency,Agency Name,Complaint Type,Descriptor,Incident Zip,Resolution Description\n\
                   01/01/2020 10:00:00 AM,NYPD,NYPD,Noise,row0,10001,Resolved\n";
        let mut sink = VecSink::default();
        let err = load(csv.as_bytes(), &mut sink, &opts(10)).await.unwrap_err();
        assert!(matches!(err, LoadError::Schema(c) if c == "Borough"));
        assert!(sink.batches.is_empty());
    }

    #[tokio::test]
    async fn sink_failure_keeps_exactly_the_committed_batches() {
        let mut sink = FailingSink {
            ok_batches: 2,
            batches: Vec::new(),
        };
        let err = load(sample_csv(35).as_bytes(), &mut sink, &opts(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Sink(_)));
        assert_eq!(sink.batches.len(), 2);
        assert_eq!(sink.batches.iter().flatten().count(), 20);
    }

    #[tokio::test]
    async fn invalid_date_becomes_null_other_fields_verbatim() {
        let csv = format!(
            "{}13/40/2020 25:99:00 XM,NYPD,New York City Police Department,Noise,Loud Music,11372,QUEENS,Resolved\n",
            HEADER
        );
        let mut sink = VecSink::default();
        load(csv.as_bytes(), &mut sink, &opts(10)).await.unwrap();
        let row = &sink.batches[0][0];
        assert_eq!(row.created_date, None);
        assert_eq!(row.agency, "NYPD");
        assert_eq!(row.agency_name, "New York City Police Department");
        assert_eq!(row.complaint_type, "Noise");
        assert_eq!(row.descriptor, "Loud Music");
        assert_eq!(row.incident_zip, "11372");
        assert_eq!(row.borough, "QUEENS");
        assert_eq!(row.resolution_description, "Resolved");
    }

    #[tokio::test]
    async fn reads_from_a_real_file() {
        use std::io::Write as _;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(sample_csv(8).as_bytes()).unwrap();
        let file = std::fs::File::open(tmp.path()).unwrap();
        let mut sink = VecSink::default();
        let total = load(std::io::BufReader::new(file), &mut sink, &opts(3))
            .await
            .unwrap();
        assert_eq!(total, 8);
        let sizes: Vec<usize> = sink.batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2]);
    }

    #[tokio::test]
    async fn empty_source_imports_zero_rows() {
        let mut sink = VecSink::default();
        let total = load(HEADER.as_bytes(), &mut sink, &opts(10)).await.unwrap();
        assert_eq!(total, 0);
        assert!(sink.batches.is_empty());
    }

    #[tokio::test]
    async fn zero_options_are_clamped_to_one() {
        let mut sink = VecSink::default();
        let total = load(
            sample_csv(5).as_bytes(),
            &mut sink,
            &LoadOptions {
                chunk_size: 0,
                report_every: 0,
            },
        )
        .await
        .unwrap();
        assert_eq!(total, 5);
        let sizes: Vec<usize> = sink.batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1, 1, 1, 1, 1]);
    }

    /// Collects formatted log output so progress lines can be asserted on.
    #[derive(Clone, Default)]
    struct CaptureWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn progress_lines_fire_after_each_full_batch() {
        let capture = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);

        let mut sink = VecSink::default();
        let total = load(sample_csv(25).as_bytes(), &mut sink, &opts(10))
            .await
            .unwrap();
        drop(guard);
        assert_eq!(total, 25);

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let progress: Vec<&str> = output
            .lines()
            .filter(|l| l.contains("imported so far"))
            .collect();
        assert_eq!(progress.len(), 2, "one progress line per full batch");
        assert!(progress[0].contains("rows=10"));
        assert!(progress[1].contains("rows=20"));

        let summary: Vec<&str> = output
            .lines()
            .filter(|l| l.contains("import complete"))
            .collect();
        assert_eq!(summary.len(), 1);
        assert!(summary[0].contains("rows=25"));
    }

    #[tokio::test]
    async fn remainder_batch_reports_only_in_the_summary() {
        let capture = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);

        let mut sink = VecSink::default();
        load(sample_csv(7).as_bytes(), &mut sink, &opts(10))
            .await
            .unwrap();
        drop(guard);

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(!output.contains("imported so far"));
        assert!(output.contains("import complete"));
    }
}
