use log::{info, warn};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::Rng;

use crate::common::get_current_time_or_zero;

const NODE_ID_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_NODE_ID: u64 = (1 << NODE_ID_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_LEFT_SHIFT: u64 = SEQUENCE_BITS + NODE_ID_BITS;
const EPOCH: u64 = 1288834974657;

/// Generates 64-bit ids laid out as `timestamp | node | sequence`.
///
/// Ids from one generator are strictly increasing. When the sequence for the
/// current millisecond is exhausted, or the clock moves backwards, the
/// generator waits for the next millisecond instead of reusing an id.
pub struct SnowflakeIdGenerator {
    node_id: u64,
    state: Mutex<GeneratorState>,
}

struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

impl SnowflakeIdGenerator {
    pub fn new() -> Self {
        let mut node_id = random_node_id();
        if node_id > MAX_NODE_ID {
            warn!("Node id can't be greater than {}", MAX_NODE_ID);
            node_id = OsRng.gen_range(1..=MAX_NODE_ID);
        }
        info!("Id generator initialized with node id: {}", node_id);

        SnowflakeIdGenerator {
            node_id,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    pub fn get_id(&self) -> u64 {
        let mut state = self.state.lock();
        let mut timestamp = current_millis();

        if timestamp < state.last_timestamp {
            warn!(
                "Clock moved backwards by {} ms, waiting",
                state.last_timestamp - timestamp
            );
            timestamp = wait_until(state.last_timestamp);
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                timestamp = wait_until(state.last_timestamp + 1);
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        ((timestamp - EPOCH) << TIMESTAMP_LEFT_SHIFT)
            | (self.node_id << SEQUENCE_BITS)
            | state.sequence
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }
}

impl Default for SnowflakeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn current_millis() -> u64 {
    get_current_time_or_zero() as u64
}

fn wait_until(target: u64) -> u64 {
    let mut now = current_millis();
    while now < target {
        std::thread::sleep(std::time::Duration::from_millis(target - now));
        now = current_millis();
    }
    now
}

fn random_node_id() -> u64 {
    let uuid = uuid::Uuid::new_v4();
    let uid = uuid.as_bytes();
    let rnd_byte = OsRng.gen::<u64>() & 0x000000FF;

    ((0x000000FF & uid[uid.len() - 1] as u64) | (0x0000FF00 & (rnd_byte << 8))) >> 6
}
