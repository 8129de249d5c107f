use hashbrown::HashMap;

/// A dereplicated sequence variant within a sample.
#[derive(Debug, PartialEq, Clone)]
pub struct Haplotype {
    pub id: String,
    pub size: u64,
    pub seq: String,
}

/// A single sample: its haplotypes plus the per-haplotype rank table.
///
/// `ranks` holds the rank names from the table header in column order;
/// `hap2rank` maps a haplotype id to its rank names in that same order.
#[derive(Debug, PartialEq, Clone)]
pub struct Sample {
    pub id: String,
    pub haps: HashMap<String, Haplotype>,
    pub ranks: Vec<String>,
    pub hap2rank: HashMap<String, Vec<String>>,
}

impl Sample {
    pub fn hap_size(&self, hap: &str) -> Option<u64> {
        self.haps.get(hap).map(|h| h.size)
    }

    pub fn hap_seq(&self, hap: &str) -> Option<&str> {
        self.haps.get(hap).map(|h| h.seq.as_str())
    }

    pub fn rank_index(&self, rank: &str) -> Option<usize> {
        self.ranks.iter().position(|r| r == rank)
    }

    pub fn rank_name(&self, hap: &str, rank: &str) -> Option<&str> {
        let idx = self.rank_index(rank)?;
        self.hap2rank.get(hap)?.get(idx).map(|s| s.as_str())
    }

    /// haplotype ids in lexicographic order, for deterministic output
    pub fn sorted_haps(&self) -> Vec<&String> {
        let mut ids: Vec<&String> = self.hap2rank.keys().collect();
        ids.sort();
        ids
    }
}

/// The full project: every loaded sample keyed by id.
#[derive(Debug, Default, Clone)]
pub struct SampleBundle {
    pub samples: HashMap<String, Sample>,
    pub sample_ids: Vec<String>,
}

impl SampleBundle {
    pub fn new(samples: Vec<Sample>) -> Self {
        let mut sample_ids: Vec<String> = samples.iter().map(|s| s.id.clone()).collect();
        sample_ids.sort();

        let samples = samples.into_iter().map(|s| (s.id.clone(), s)).collect();

        SampleBundle {
            samples,
            sample_ids,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Sample> {
        self.samples.get(id)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// resolve an optional user-provided sample list against the bundle
    pub fn resolve_sample_ids(&self, requested: &[String]) -> anyhow::Result<Vec<String>> {
        if requested.is_empty() {
            log::info!(
                "No sample ID list specified. Using all {} samples.",
                self.sample_ids.len()
            );
            return Ok(self.sample_ids.clone());
        }

        for id in requested {
            if !self.samples.contains_key(id) {
                anyhow::bail!("ERROR: sample {} not found in bundle", id);
            }
        }

        log::info!("Specified {} samples.", requested.len());
        Ok(requested.to_vec())
    }
}
