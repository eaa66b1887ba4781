#![no_main]

use libfuzzer_sys::fuzz_target;
use pyscope::{AnalysisPipeline, Sample};

fuzz_target!(|data: &[u8]| {
    let sample = Sample::from_mem(data.to_vec());
    let _ = AnalysisPipeline::default().run(&sample);
});
