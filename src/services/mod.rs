/// Buzzer presses and admin verdicts.
pub mod buzzer_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game lifecycle driven by admins.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Fan-out of game events to SSE subscribers.
pub mod notification_service;
/// Two-step team registration.
pub mod registration_service;
/// Players, teams and memberships.
pub mod roster_service;
/// Score awards and tables.
pub mod scoring_service;
/// Server-Sent Events streaming.
pub mod sse_service;
/// Store supervisor toggling degraded mode.
pub mod storage_supervisor;
