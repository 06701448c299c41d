/// Remote buzzer lock document storage.
pub mod buzzer_store;
/// Local named-slot persistence and the typed board store.
pub mod slots;
/// Storage abstraction shared by every backend.
pub mod storage;
