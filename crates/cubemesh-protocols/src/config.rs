//! Node configuration.

use std::str::FromStr;
use std::time::Duration;

use cubemesh_election::ElectionRules;
use cubemesh_topology::{SideTable, DEFAULT_CUBE_SIZE, MAX_CUBE_SIZE, MAX_PATH_LEN};

use crate::dedup;
use crate::error::{Error, Result};

/// Configuration for a cube node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshConfig {
    /// Time between originated heartbeats
    pub heartbeat_interval: Duration,

    /// Silence after which a neighbour is dropped
    pub neighbor_timeout: Duration,

    /// Frames remembered for duplicate suppression
    pub dedup_capacity: usize,

    /// Cube footprint in world units
    pub cube_size: i32,

    /// Side index to grid offset
    pub sides: SideTable,

    /// Claims with paths this long or longer are not followed
    pub max_path_len: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(1000),
            neighbor_timeout: Duration::from_millis(3000),
            dedup_capacity: dedup::DEFAULT_CAPACITY,
            cube_size: DEFAULT_CUBE_SIZE,
            sides: SideTable::standard(),
            max_path_len: ElectionRules::DEFAULT_MAX_PATH_LEN,
        }
    }
}

impl MeshConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `CUBEMESH_HEARTBEAT_MS`: heartbeat interval in milliseconds
    /// - `CUBEMESH_TIMEOUT_MS`: neighbour timeout in milliseconds
    /// - `CUBEMESH_DEDUP_CAPACITY`: duplicate filter window
    /// - `CUBEMESH_CUBE_SIZE`: cube footprint in world units
    /// - `CUBEMESH_MAX_PATH_LEN`: longest path a claim may carry
    /// - `CUBEMESH_SIDES`: number of wired sides, taken from the standard table
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(ms) = env_value::<u64>("CUBEMESH_HEARTBEAT_MS")? {
            config.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_value::<u64>("CUBEMESH_TIMEOUT_MS")? {
            config.neighbor_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = env_value("CUBEMESH_DEDUP_CAPACITY")? {
            config.dedup_capacity = capacity;
        }
        if let Some(size) = env_value("CUBEMESH_CUBE_SIZE")? {
            config.cube_size = size;
        }
        if let Some(len) = env_value("CUBEMESH_MAX_PATH_LEN")? {
            config.max_path_len = len;
        }
        if let Some(count) = env_value("CUBEMESH_SIDES")? {
            config.sides = SideTable::standard_prefix(count)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the neighbour timeout.
    #[must_use]
    pub fn with_neighbor_timeout(mut self, timeout: Duration) -> Self {
        self.neighbor_timeout = timeout;
        self
    }

    /// Set the duplicate filter window.
    #[must_use]
    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity;
        self
    }

    /// Set the cube footprint.
    #[must_use]
    pub fn with_cube_size(mut self, size: i32) -> Self {
        self.cube_size = size;
        self
    }

    /// Set the side table.
    #[must_use]
    pub fn with_side_table(mut self, sides: SideTable) -> Self {
        self.sides = sides;
        self
    }

    /// Set the longest path a followed claim may carry.
    #[must_use]
    pub fn with_max_path_len(mut self, len: usize) -> Self {
        self.max_path_len = len;
        self
    }

    /// Election parameters derived from this configuration.
    pub fn election_rules(&self) -> ElectionRules {
        ElectionRules {
            max_path_len: self.max_path_len,
        }
    }

    /// Check that the values can run a mesh.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(Error::Config("heartbeat interval must be positive".into()));
        }
        if self.neighbor_timeout <= self.heartbeat_interval {
            return Err(Error::Config(format!(
                "neighbor timeout {:?} must exceed heartbeat interval {:?}",
                self.neighbor_timeout, self.heartbeat_interval
            )));
        }
        if self.dedup_capacity == 0 {
            return Err(Error::Config("dedup capacity must be positive".into()));
        }
        if self.cube_size <= 0 || self.cube_size > MAX_CUBE_SIZE {
            return Err(Error::Config(format!(
                "cube size {} must be within 1..={}",
                self.cube_size, MAX_CUBE_SIZE
            )));
        }
        if self.max_path_len == 0 || self.max_path_len > MAX_PATH_LEN {
            return Err(Error::Config(format!(
                "max path length {} must be within 1..={}",
                self.max_path_len, MAX_PATH_LEN
            )));
        }
        Ok(())
    }
}

fn env_value<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name}={raw:?} is not a valid value"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Config(format!("{name}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_timing() {
        let config = MeshConfig::default();

        assert_eq!(config.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(config.neighbor_timeout, Duration::from_secs(3));
        assert_eq!(config.dedup_capacity, 100);
        assert_eq!(config.cube_size, 128);
        assert_eq!(config.sides.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_override_fields() {
        let config = MeshConfig::new()
            .with_heartbeat_interval(Duration::from_millis(200))
            .with_neighbor_timeout(Duration::from_millis(700))
            .with_dedup_capacity(16)
            .with_cube_size(64)
            .with_side_table(SideTable::standard_prefix(2).unwrap())
            .with_max_path_len(8);

        assert_eq!(config.heartbeat_interval, Duration::from_millis(200));
        assert_eq!(config.sides.len(), 2);
        assert_eq!(config.election_rules().max_path_len, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn timeout_must_exceed_interval() {
        let config = MeshConfig::new().with_neighbor_timeout(Duration::from_millis(1000));
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn nonsense_values_rejected() {
        assert!(MeshConfig::new().with_dedup_capacity(0).validate().is_err());
        assert!(MeshConfig::new().with_cube_size(0).validate().is_err());
        assert!(MeshConfig::new().with_max_path_len(0).validate().is_err());
        assert!(MeshConfig::new().with_max_path_len(256).validate().is_err());
        assert!(MeshConfig::new()
            .with_heartbeat_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn cube_size_bounded_by_coordinate_range() {
        assert!(MeshConfig::new().with_cube_size(MAX_CUBE_SIZE).validate().is_ok());
        assert!(MeshConfig::new().with_cube_size(MAX_CUBE_SIZE + 1).validate().is_err());
        assert!(matches!(
            MeshConfig::new().with_cube_size(1 << 30).validate(),
            Err(Error::Config(_))
        ));
    }
}
