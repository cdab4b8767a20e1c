//! Plain data row types written by output backends.

/// One thing that happened on the line.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub tick:      u64,
    pub time_secs: f64,
    pub segment:   String,
    /// The load concerned, if any.
    pub load:      Option<u32>,
    /// Short tag: a phase name, `motor_on`, `gate_closed`, `train_released`…
    pub event:     String,
    /// Free-form detail; empty when the tag says it all.
    pub detail:    String,
}

/// One released train.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRow {
    pub tick:      u64,
    pub time_secs: f64,
    pub segment:   String,
    pub size:      u32,
    pub complete:  bool,
    pub forced:    bool,
    /// Load ids in train order.
    pub loads:     Vec<u32>,
}

impl TrainRow {
    /// Load ids joined with `;`, as stored in text columns.
    pub fn loads_field(&self) -> String {
        self.loads.iter().map(u32::to_string).collect::<Vec<_>>().join(";")
    }
}
