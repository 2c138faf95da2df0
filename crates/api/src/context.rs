use provd_core::WorkerId;

/// Identity of the provisioner daemon making a request.
///
/// Present on every `/provisionerd` route; ownership checks are made against it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WorkerContext {
    worker_id: WorkerId,
}

impl WorkerContext {
    pub fn new(worker_id: WorkerId) -> Self {
        Self { worker_id }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }
}
