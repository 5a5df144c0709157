use crate::error::Result;
use crate::habit::Habit;

/// Persistence collaborator for habits.
///
/// Writes are compare-and-swap on [`Habit::revision`]: `update` only lands
/// if the stored revision still equals the one the caller read, which keeps
/// concurrent completions from silently overwriting each other.
pub trait HabitStore {
    /// Insert a new habit. Its revision is stored as given.
    fn insert(&self, habit: &Habit) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<Habit>>;

    /// All habits, newest first.
    fn list(&self) -> Result<Vec<Habit>>;

    /// Persist `habit` if the stored revision equals `habit.revision`.
    ///
    /// Returns the habit with its new revision.
    ///
    /// # Errors
    /// `CoreError::NotFound` if the habit is gone, `CoreError::Conflict` if
    /// another writer got there first.
    fn update(&self, habit: &Habit) -> Result<Habit>;

    /// Returns `false` if no habit had this id.
    fn delete(&self, id: &str) -> Result<bool>;
}
