pub mod dataset_normalizer;
pub mod enrichment;
pub mod traffic_analysis;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;
