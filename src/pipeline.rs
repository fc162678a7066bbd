//! Transform pipeline orchestration
//!
//! Runs a source image through validate → format → quality → resize →
//! emit against a codec engine. The quality step is an adaptive search
//! that walks compression quality downward until the output fits a
//! caller-supplied byte budget.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::engine::CodecEngine;
use crate::error::RepixError;
use crate::options::{OutputFormat, TransformOptions};
use crate::source::SourceFile;

/// Output of a single pipeline invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Encoded output blob
    pub data: Vec<u8>,
    /// Final output format
    pub format: OutputFormat,
    /// Compression quality that produced the blob
    pub quality: u8,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
}

impl TransformResult {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Drives a codec engine through the transform steps.
///
/// Holds one mutable in-flight image at a time; concurrent transforms
/// need independent pipeline instances. The instance-level crop flag is
/// OR-ed with the per-call `crop` option.
pub struct TransformPipeline<E: CodecEngine> {
    engine: E,
    crop: bool,
}

impl<E: CodecEngine> TransformPipeline<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            crop: false,
        }
    }

    /// Create a pipeline that crops every transform regardless of the
    /// per-call option
    pub fn with_crop(engine: E, crop: bool) -> Self {
        Self { engine, crop }
    }

    /// Transform a source image, releasing the engine's in-flight
    /// resources afterwards
    pub fn transform(
        &mut self,
        source: &SourceFile,
        raw_options: &HashMap<String, String>,
    ) -> Result<TransformResult, RepixError> {
        self.transform_with(source, raw_options, true)
    }

    /// Transform a source image.
    ///
    /// Steps are strictly ordered and fail fast: the format must be set
    /// before the quality search (encoded size depends on it) and quality
    /// must be resolved before the final resize and emit. With `release`
    /// unset the decoded image stays in the engine for inspection; the
    /// pipeline should not be reused until `release` runs.
    pub fn transform_with(
        &mut self,
        source: &SourceFile,
        raw_options: &HashMap<String, String>,
        release: bool,
    ) -> Result<TransformResult, RepixError> {
        if !source.is_image() {
            return Err(RepixError::not_an_image(source.mime_type()));
        }

        let options = TransformOptions::from_raw(raw_options, source.extension())?;

        let (src_w, src_h) = self.engine.decode(source.raw())?;
        debug!(src_w, src_h, format = %options.format, "decoded source image");

        self.engine.set_format(options.format)?;

        let quality = select_quality(
            &mut self.engine,
            options.min_quality.get(),
            options.max_quality.get(),
            options.max_file_size_bytes,
        )?;

        let effective_crop = self.crop || options.crop;
        let (out_w, out_h) = if effective_crop {
            self.engine.resize_exact(options.width, options.height)?;
            (options.width, options.height)
        } else {
            self.engine.resize_best_fit(options.width, options.height)?
        };

        let data = self.engine.encode()?;
        if release {
            self.engine.release();
        }

        info!(
            out_w,
            out_h,
            quality,
            bytes = data.len(),
            crop = effective_crop,
            "image transformed"
        );

        Ok(TransformResult {
            data,
            format: options.format,
            quality,
            width: out_w,
            height: out_h,
        })
    }
}

/// Choose and apply a compression quality.
///
/// With no byte budget the ceiling is applied directly and nothing is
/// encoded here. With a budget, quality walks down from `max` to `min`
/// in a linear scan, re-encoding at each step, and stops at the first
/// quality whose output fits the budget. The scan is deliberately not a
/// binary search: encoded size is not guaranteed monotonic in quality,
/// so the first satisfying value from the least-compressed end wins.
///
/// If the last measured size is no smaller than the pre-search baseline
/// (the encode at whatever quality was already set), compression bought
/// nothing and the quality is forced back to `max`.
///
/// Returns the quality left applied on the engine.
pub fn select_quality<E: CodecEngine>(
    engine: &mut E,
    min: u8,
    max: u8,
    max_file_size_bytes: Option<u64>,
) -> Result<u8, RepixError> {
    let Some(budget) = max_file_size_bytes else {
        engine.set_quality(max)?;
        return Ok(max);
    };

    // Inverted range scans nothing; options validation rejects this
    // upstream, but the returned quality must still match the engine
    if max < min {
        engine.set_quality(max)?;
        return Ok(max);
    }

    let starting_size = engine.encode()?.len() as u64;

    let mut quality = max;
    let mut size;
    let mut applied;
    loop {
        engine.set_quality(quality)?;
        size = engine.encode()?.len() as u64;
        applied = quality;
        debug!(quality, size, budget, "quality search step");

        if size <= budget || quality == min {
            break;
        }
        quality -= 1;
    }

    if size >= starting_size {
        debug!(
            starting_size,
            size, "compression did not help, reverting to max quality"
        );
        engine.set_quality(max)?;
        applied = max;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Quality;

    /// Engine fake that serves scripted encode sizes per quality and
    /// records every call in order.
    struct ScriptedEngine {
        sizes: HashMap<u8, usize>,
        quality: u8,
        calls: Vec<String>,
    }

    impl ScriptedEngine {
        fn new(sizes: &[(u8, usize)]) -> Self {
            Self {
                sizes: sizes.iter().copied().collect(),
                quality: Quality::MAX.get(),
                calls: Vec::new(),
            }
        }

        fn quality_steps(&self) -> Vec<u8> {
            self.calls
                .iter()
                .filter_map(|c| c.strip_prefix("set_quality:"))
                .map(|q| q.parse().unwrap())
                .collect()
        }

        fn encode_count(&self) -> usize {
            self.calls.iter().filter(|c| *c == "encode").count()
        }
    }

    impl CodecEngine for ScriptedEngine {
        fn decode(&mut self, _data: &[u8]) -> Result<(u32, u32), RepixError> {
            self.calls.push("decode".to_string());
            Ok((500, 300))
        }

        fn set_format(&mut self, format: OutputFormat) -> Result<(), RepixError> {
            self.calls.push(format!("set_format:{}", format));
            Ok(())
        }

        fn set_quality(&mut self, quality: u8) -> Result<(), RepixError> {
            self.calls.push(format!("set_quality:{}", quality));
            self.quality = quality;
            Ok(())
        }

        fn resize_best_fit(&mut self, width: u32, height: u32) -> Result<(u32, u32), RepixError> {
            self.calls.push(format!("resize_best_fit:{}x{}", width, height));
            Ok((width, height))
        }

        fn resize_exact(&mut self, width: u32, height: u32) -> Result<(), RepixError> {
            self.calls.push(format!("resize_exact:{}x{}", width, height));
            Ok(())
        }

        fn encode(&mut self) -> Result<Vec<u8>, RepixError> {
            self.calls.push("encode".to_string());
            let size = *self.sizes.get(&self.quality).unwrap_or(&1000);
            Ok(vec![0u8; size])
        }

        fn release(&mut self) {
            self.calls.push("release".to_string());
        }
    }

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn jpeg_source() -> SourceFile {
        // The scripted engine never inspects the bytes, but format
        // defaulting still reads the extension
        let mut source = SourceFile::from_bytes_with_mime(b"scripted".to_vec(), "image/jpeg");
        source.set_extension("jpg");
        source
    }

    #[test]
    fn test_no_budget_applies_max_without_encoding() {
        let mut engine = ScriptedEngine::new(&[]);
        let quality = select_quality(&mut engine, 1, 80, None).unwrap();
        assert_eq!(quality, 80);
        assert_eq!(engine.quality_steps(), vec![80]);
        assert_eq!(engine.encode_count(), 0);
    }

    #[test]
    fn test_scan_stops_at_first_quality_within_budget() {
        // Budget reachable only at 7: the scan must try 8 then 7 and
        // never evaluate 6 or 5
        let mut engine =
            ScriptedEngine::new(&[(100, 1000), (8, 900), (7, 500), (6, 450), (5, 400)]);
        let quality = select_quality(&mut engine, 5, 8, Some(600)).unwrap();
        assert_eq!(quality, 7);
        assert_eq!(engine.quality_steps(), vec![8, 7]);
        // Baseline encode plus one per candidate
        assert_eq!(engine.encode_count(), 3);
    }

    #[test]
    fn test_scan_exhausts_to_min_quality() {
        let mut engine = ScriptedEngine::new(&[(100, 1000), (8, 900), (7, 800), (6, 700), (5, 300)]);
        let quality = select_quality(&mut engine, 5, 8, Some(350)).unwrap();
        assert_eq!(quality, 5);
        assert_eq!(engine.quality_steps(), vec![8, 7, 6, 5]);
    }

    #[test]
    fn test_fallback_to_max_when_compression_never_helps() {
        // Every candidate is larger than the baseline: force max quality
        let mut engine =
            ScriptedEngine::new(&[(100, 1000), (8, 1200), (7, 1100), (6, 1050), (5, 1020)]);
        let quality = select_quality(&mut engine, 5, 8, Some(600)).unwrap();
        assert_eq!(quality, 8);
        assert_eq!(engine.quality_steps(), vec![8, 7, 6, 5, 8]);
    }

    #[test]
    fn test_fallback_applies_even_when_budget_was_met() {
        // The stopping size satisfies the budget but exceeds the
        // pre-search baseline, so the search result is discarded
        let mut engine = ScriptedEngine::new(&[(100, 1000), (8, 1600), (7, 1200)]);
        let quality = select_quality(&mut engine, 1, 8, Some(1300)).unwrap();
        assert_eq!(quality, 8);
        assert_eq!(engine.quality_steps(), vec![8, 7, 8]);
    }

    #[test]
    fn test_inverted_range_applies_max_without_scanning() {
        let mut engine = ScriptedEngine::new(&[]);
        let quality = select_quality(&mut engine, 9, 4, Some(600)).unwrap();
        assert_eq!(quality, 4);
        assert_eq!(engine.quality_steps(), vec![4]);
        assert_eq!(engine.encode_count(), 0);
    }

    #[test]
    fn test_equal_min_max_single_candidate() {
        let mut engine = ScriptedEngine::new(&[(100, 1000), (7, 400)]);
        let quality = select_quality(&mut engine, 7, 7, Some(600)).unwrap();
        assert_eq!(quality, 7);
        assert_eq!(engine.quality_steps(), vec![7]);
    }

    #[test]
    fn test_pipeline_step_order_best_fit() {
        let mut pipeline = TransformPipeline::new(ScriptedEngine::new(&[]));
        let result = pipeline
            .transform(&jpeg_source(), &raw(&[("width", "400"), ("height", "200")]))
            .unwrap();

        assert_eq!((result.width, result.height), (400, 200));
        assert_eq!(result.quality, 100);
        assert_eq!(result.format, OutputFormat::Jpeg);
        assert_eq!(
            pipeline.engine.calls,
            vec![
                "decode",
                "set_format:jpeg",
                "set_quality:100",
                "resize_best_fit:400x200",
                "encode",
                "release",
            ]
        );
    }

    #[test]
    fn test_pipeline_crop_uses_exact_resize() {
        let mut pipeline = TransformPipeline::new(ScriptedEngine::new(&[]));
        let result = pipeline
            .transform(
                &jpeg_source(),
                &raw(&[("width", "400"), ("height", "200"), ("crop", "true")]),
            )
            .unwrap();

        assert_eq!((result.width, result.height), (400, 200));
        assert!(pipeline
            .engine
            .calls
            .contains(&"resize_exact:400x200".to_string()));
    }

    #[test]
    fn test_pipeline_instance_crop_flag() {
        let mut pipeline = TransformPipeline::with_crop(ScriptedEngine::new(&[]), true);
        pipeline
            .transform(&jpeg_source(), &raw(&[("width", "100"), ("height", "100")]))
            .unwrap();
        assert!(pipeline
            .engine
            .calls
            .contains(&"resize_exact:100x100".to_string()));
    }

    #[test]
    fn test_pipeline_rejects_non_image_before_engine_runs() {
        let source = SourceFile::from_bytes(b"plain text".to_vec());
        let mut pipeline = TransformPipeline::new(ScriptedEngine::new(&[]));
        let result = pipeline.transform(&source, &raw(&[("width", "10"), ("height", "10")]));

        assert!(matches!(result, Err(RepixError::NotAnImage { .. })));
        assert!(pipeline.engine.calls.is_empty());
    }

    #[test]
    fn test_pipeline_validation_failure_leaves_engine_untouched() {
        let mut pipeline = TransformPipeline::new(ScriptedEngine::new(&[]));
        let result = pipeline.transform(&jpeg_source(), &raw(&[("height", "10")]));

        assert!(matches!(
            result,
            Err(RepixError::InvalidParameter { ref param, .. }) if param == "width"
        ));
        assert!(pipeline.engine.calls.is_empty());
    }

    #[test]
    fn test_pipeline_without_release_keeps_engine_state() {
        let mut pipeline = TransformPipeline::new(ScriptedEngine::new(&[]));
        pipeline
            .transform_with(
                &jpeg_source(),
                &raw(&[("width", "10"), ("height", "10")]),
                false,
            )
            .unwrap();
        assert!(!pipeline.engine.calls.contains(&"release".to_string()));
    }

    #[test]
    fn test_pipeline_no_budget_single_encode() {
        let mut pipeline = TransformPipeline::new(ScriptedEngine::new(&[]));
        pipeline
            .transform(&jpeg_source(), &raw(&[("width", "10"), ("height", "10")]))
            .unwrap();
        assert_eq!(pipeline.engine.encode_count(), 1);
    }

    #[test]
    fn test_pipeline_budget_search_then_resize() {
        let mut pipeline =
            TransformPipeline::new(ScriptedEngine::new(&[(100, 1000), (8, 900), (7, 500)]));
        let result = pipeline
            .transform(
                &jpeg_source(),
                &raw(&[
                    ("width", "400"),
                    ("height", "200"),
                    ("min_quality", "5"),
                    ("max_quality", "8"),
                    ("max_file_size_bytes", "600"),
                ]),
            )
            .unwrap();

        assert_eq!(result.quality, 7);
        // Quality is resolved before the resize step
        let calls = &pipeline.engine.calls;
        let last_quality = calls.iter().rposition(|c| c.starts_with("set_quality")).unwrap();
        let resize = calls.iter().position(|c| c.starts_with("resize")).unwrap();
        assert!(last_quality < resize);
    }
}
