pub mod codec;
pub mod config;
pub mod context;
pub mod controller;
pub mod events;
pub mod history;
pub mod refresh;
pub mod submission;

pub use codec::{PartialViewState, ViewState, decode, encode};
pub use config::MapConfig;
pub use context::{AppContext, DebugSnapshot};
pub use controller::ViewStateController;
pub use events::SyncEvent;
pub use history::{HistorySink, MemoryHistory};
pub use refresh::{FetchFailure, FetchedRecords, RefreshError, RefreshTicket, parse_nodes_body};
pub use submission::{InvalidLinkError, NodeSubmission, SubmissionFailure, SubmissionReply};
