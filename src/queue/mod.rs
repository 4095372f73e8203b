mod scheduler;
mod views;

pub use scheduler::{recompute, ScheduledEncounter};
pub use views::{
    lobby_load, public_payload, staff_view, LaneCounts, LobbyLoad, PublicQueueItem, QueuePayload,
    StaffQueueItem, StaffQueueResponse,
};
