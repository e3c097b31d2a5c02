pub mod records_api;

pub use records_api::{
    GameRecordRow, GameRecordStore, HttpRecordsApi, InMemoryRecordStore, TrickRow, UserIdentity,
};
