//! Route paths.

pub const POST_USERS_LOGIN: &str = "/users/login";
pub const POST_USERS_REFRESH: &str = "/users/refresh";
pub const POST_USERS_LOGOUT: &str = "/users/logout";
pub const GET_USERS_STATUS: &str = "/users/status";
pub const POST_USERS_BOOTSTRAP: &str = "/users/bootstrap";

pub const USERS: &str = "/users";
pub const USERS_ID: &str = "/users/{id}";
pub const GET_USERS_TYPE_ROLE: &str = "/users/type/{role}";
pub const PUT_USERS_ID_SUPERVISOR: &str = "/users/{id}/supervisor/{supervisor_id}";
pub const GET_USERS_SUPERVISOR_TECHNICIANS: &str = "/users/supervisor/{supervisor_id}/technicians";

pub const JOBS: &str = "/jobs";
pub const JOBS_ID: &str = "/jobs/{id}";
pub const GET_JOBS_SUPERVISOR_TASKS: &str = "/jobs/supervisor/{id}/tasks";
pub const GET_JOBS_TECHNICIAN_TASKS: &str = "/jobs/technician/{id}/tasks";
pub const PUT_JOBS_TASK: &str = "/jobs/{id}/device/{device_id}/task/{task_id}";
pub const PUT_JOBS_TASK_RESPONSE: &str = "/jobs/{id}/device/{device_id}/task/{task_id}/response";

/// Path the refresh cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = "/users";
