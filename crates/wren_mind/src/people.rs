//! Person records and familiarity tiers.
//!
//! The camera assigns stable ids to the faces it recognizes; here each
//! id accumulates an interaction history that grades from stranger to
//! family. Familiar people get calmer, lower-key engagement.

const MAX_PEOPLE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Familiarity {
    Stranger,
    Acquaintance,
    Familiar,
    Family,
}

impl Familiarity {
    fn from_interactions(count: u32) -> Self {
        match count {
            0..=2 => Familiarity::Stranger,
            3..=20 => Familiarity::Acquaintance,
            21..=100 => Familiarity::Familiar,
            _ => Familiarity::Family,
        }
    }

    /// How intensely to engage. Novelty demands attention; family gets
    /// ambient acknowledgment.
    pub fn engagement_intensity(self) -> f32 {
        match self {
            Familiarity::Stranger => 0.8,
            Familiarity::Acquaintance => 0.5,
            Familiarity::Familiar => 0.2,
            Familiarity::Family => 0.1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Familiarity::Stranger => "stranger",
            Familiarity::Acquaintance => "acquaintance",
            Familiarity::Familiar => "familiar",
            Familiarity::Family => "family",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersonRecord {
    pub id: u32,
    pub interaction_count: u32,
    pub last_seen: f64,
    pub average_distance: f32,
    pub familiarity: Familiarity,
}

#[derive(Debug, Clone, Default)]
pub struct PeopleRegistry {
    people: Vec<PersonRecord>,
    current_person: Option<u32>,
    interaction_start: f64,
}

impl PeopleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<&PersonRecord> {
        self.people.iter().find(|p| p.id == id)
    }

    /// Record a sighting. Returns the updated record, or `None` when the
    /// registry is full and the id is new.
    pub fn register_sighting(
        &mut self,
        id: u32,
        distance: f32,
        now: f64,
    ) -> Option<&PersonRecord> {
        if let Some(index) = self.people.iter().position(|p| p.id == id) {
            let person = &mut self.people[index];
            person.interaction_count += 1;
            person.last_seen = now;
            person.average_distance = 0.9 * person.average_distance + 0.1 * distance;
            person.familiarity = Familiarity::from_interactions(person.interaction_count);
            return Some(&self.people[index]);
        }

        if self.people.len() >= MAX_PEOPLE {
            return None;
        }
        self.people.push(PersonRecord {
            id,
            interaction_count: 1,
            last_seen: now,
            average_distance: distance,
            familiarity: Familiarity::Stranger,
        });
        self.people.last().map(|p| p as _)
    }

    /// Sighting plus interaction bookkeeping. Returns the social boost
    /// the caller should feed into needs.
    pub fn handle_detection(&mut self, id: u32, distance: f32, now: f64) -> f32 {
        let Some(person) = self.register_sighting(id, distance, now) else {
            return 0.0;
        };
        let intensity = person.familiarity.engagement_intensity();

        if self.current_person != Some(id) {
            self.current_person = Some(id);
            self.interaction_start = now;
            tracing::debug!(
                id,
                familiarity = self.get(id).map(|p| p.familiarity.as_str()).unwrap_or("?"),
                "interaction started"
            );
        }
        intensity * 0.2
    }

    pub fn interaction_duration(&self, now: f64) -> f64 {
        if self.current_person.is_some() {
            (now - self.interaction_start).max(0.0)
        } else {
            0.0
        }
    }

    pub fn end_interaction(&mut self) {
        self.current_person = None;
    }

    pub fn current_person(&self) -> Option<&PersonRecord> {
        self.current_person.and_then(|id| self.get(id))
    }

    pub fn is_recognized(&self, id: u32) -> bool {
        self.get(id)
            .is_some_and(|p| p.familiarity > Familiarity::Stranger)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}
