//! Mutant - a genome with bandit counters and a mutation audit trail

use crate::allocator::ChoiceStats;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// One typed value a genome property can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Signed integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Free-text value
    Text(String),
    /// Boolean value
    Flag(bool),
}

impl PropertyValue {
    /// Project the value onto the number line for variance math.
    ///
    /// Numerics map directly and flags map to 0/1. Text hashes through
    /// `FxHasher`, which turns category churn into a rough unordered
    /// spread signal rather than a meaningful magnitude.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn numeric_projection(&self) -> f64 {
        match self {
            Self::Int(v) => *v as f64,
            Self::Float(v) => *v,
            Self::Flag(v) => f64::from(u8::from(*v)),
            Self::Text(v) => {
                let mut hasher = rustc_hash::FxHasher::default();
                v.hash(&mut hasher);
                hasher.finish() as f64
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Flag(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

/// Candidate values per property, shared by every mutant of one species.
///
/// Mutation redraws uniformly from the property's candidate list, so the
/// domain bounds the reachable genome space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyDomain {
    properties: BTreeMap<String, Vec<PropertyValue>>,
}

impl PropertyDomain {
    /// Create an empty domain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property with its candidate values (chainable).
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, values: Vec<PropertyValue>) -> Self {
        self.properties.insert(name.into(), values);
        self
    }

    /// Names of all properties, in sorted order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Candidate values for a property, if it exists.
    #[must_use]
    pub fn values(&self, property: &str) -> Option<&[PropertyValue]> {
        self.properties.get(property).map(Vec::as_slice)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check whether the domain has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Draw one candidate value for a property uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDomain`] when the property is unknown or has
    /// no candidate values.
    pub fn sample<R: Rng>(&self, property: &str, rng: &mut R) -> Result<PropertyValue> {
        self.properties
            .get(property)
            .and_then(|values| values.choose(rng))
            .cloned()
            .ok_or_else(|| Error::EmptyDomain(property.to_string()))
    }

    /// Draw a complete genome, one value per property.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDomain`] when any property has no candidates.
    pub fn random_genome<R: Rng>(&self, rng: &mut R) -> Result<BTreeMap<String, PropertyValue>> {
        let mut genome = BTreeMap::new();
        for name in self.properties.keys() {
            genome.insert(name.clone(), self.sample(name, rng)?);
        }
        Ok(genome)
    }
}

/// One recorded property redraw.
///
/// Every mutation appends one of these, even a redraw that landed on the
/// old value, so history length counts mutation attempts exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent {
    generation: u64,
    property: String,
    from: PropertyValue,
    to: PropertyValue,
}

impl MutationEvent {
    /// Create a mutation event.
    #[must_use]
    pub const fn new(
        generation: u64,
        property: String,
        from: PropertyValue,
        to: PropertyValue,
    ) -> Self {
        Self {
            generation,
            property,
            from,
            to,
        }
    }

    /// Generation (child age) at which the redraw happened.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Property that was redrawn.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Value before the redraw.
    #[must_use]
    pub const fn from(&self) -> &PropertyValue {
        &self.from
    }

    /// Value after the redraw.
    #[must_use]
    pub const fn to(&self) -> &PropertyValue {
        &self.to
    }
}

/// A genome under evolutionary search.
///
/// Carries its own bandit counters ([`ChoiceStats`]) so a zoo can
/// Thompson-sample over live mutants the same way a session samples over
/// choices, plus the full mutation history inherited down the lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutant {
    id: u64,
    properties: BTreeMap<String, PropertyValue>,
    mutation_rate: f64,
    mutation_strength: f64,
    age: u64,
    history: Vec<MutationEvent>,
    stats: ChoiceStats,
    fitness: Option<Vec<f64>>,
}

impl Mutant {
    /// Create a generation-zero mutant.
    ///
    /// `mutation_rate` is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(
        id: u64,
        properties: BTreeMap<String, PropertyValue>,
        mutation_rate: f64,
        mutation_strength: f64,
    ) -> Self {
        Self {
            id,
            properties,
            mutation_rate: mutation_rate.clamp(0.0, 1.0),
            mutation_strength,
            age: 0,
            history: Vec::new(),
            stats: ChoiceStats::default(),
            fitness: None,
        }
    }

    /// Get the mutant id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the genome.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// Per-property redraw probability during spawning.
    #[must_use]
    pub const fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    /// Mutation strength knob, inherited by children.
    ///
    /// The redraw path draws uniformly from the domain and does not scale
    /// by this value.
    #[must_use]
    pub const fn mutation_strength(&self) -> f64 {
        self.mutation_strength
    }

    /// Generations since the founding ancestor.
    #[must_use]
    pub const fn age(&self) -> u64 {
        self.age
    }

    /// Full mutation history down the lineage, oldest first.
    #[must_use]
    pub fn history(&self) -> &[MutationEvent] {
        &self.history
    }

    /// Bandit counters for zoo selection.
    #[must_use]
    pub const fn stats(&self) -> ChoiceStats {
        self.stats
    }

    /// Fitness scores from the last evaluation, if any.
    #[must_use]
    pub fn fitness(&self) -> Option<&[f64]> {
        self.fitness.as_deref()
    }

    /// Set the fitness score vector.
    pub fn set_fitness(&mut self, scores: Vec<f64>) {
        self.fitness = Some(scores);
    }

    /// Record one selection of this mutant.
    pub fn record_pull(&mut self) {
        self.stats.record_pull();
    }

    /// Record one success for this mutant.
    pub fn record_reward(&mut self) {
        self.stats.record_reward();
    }

    /// Breed a mutated child.
    ///
    /// Each property independently redraws from the domain with probability
    /// `mutation_rate`, appending one [`MutationEvent`] per redraw. The
    /// child inherits this mutant's full history, rates, and genome
    /// otherwise; counters and fitness start fresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDomain`] when a redrawn property has no
    /// candidates in `domain`.
    pub fn spawn_child<R: Rng>(
        &self,
        id: u64,
        domain: &PropertyDomain,
        rng: &mut R,
    ) -> Result<Self> {
        let age = self.age + 1;
        let mut properties = self.properties.clone();
        let mut history = self.history.clone();

        for (name, value) in &mut properties {
            if rng.gen::<f64>() < self.mutation_rate {
                let next = domain.sample(name, rng)?;
                history.push(MutationEvent::new(
                    age,
                    name.clone(),
                    value.clone(),
                    next.clone(),
                ));
                *value = next;
            }
        }

        Ok(Self {
            id,
            properties,
            mutation_rate: self.mutation_rate,
            mutation_strength: self.mutation_strength,
            age,
            history,
            stats: ChoiceStats::default(),
            fitness: None,
        })
    }

    /// Breed a crossover child with another mutant.
    ///
    /// Each property independently comes from either parent with equal
    /// probability; properties `other` lacks fall back to this mutant's
    /// value. No redraw happens, so no mutation events are appended; the
    /// child inherits this mutant's history and rates. Counters and fitness
    /// start fresh.
    #[must_use]
    pub fn crossover<R: Rng>(&self, other: &Self, id: u64, rng: &mut R) -> Self {
        let mut properties = BTreeMap::new();
        for (name, value) in &self.properties {
            let inherited = if rng.gen_bool(0.5) {
                value.clone()
            } else {
                other
                    .properties
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| value.clone())
            };
            properties.insert(name.clone(), inherited);
        }

        Self {
            id,
            properties,
            mutation_rate: self.mutation_rate,
            mutation_strength: self.mutation_strength,
            age: self.age.max(other.age) + 1,
            history: self.history.clone(),
            stats: ChoiceStats::default(),
            fitness: None,
        }
    }

    /// Save this mutant to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written or the genome fails
    /// to serialize.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a mutant from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
