use provd_core::TemplateId;
use provd_events::Pubsub;
use provd_schedule::TemplateScheduleOptions;

use crate::store::{ProvisionerStore, Template};

use super::{ProvisionerError, Server};

impl<S, P> Server<S, P>
where
    S: ProvisionerStore,
    P: Pubsub,
{
    /// Options in effect for a template under the current policy.
    pub fn template_schedule_options(
        &self,
        template_id: TemplateId,
    ) -> Result<TemplateScheduleOptions, ProvisionerError> {
        let template = self.store.get_template(template_id)?;
        Ok(self.schedule_policy.load().get_options(&template.schedule))
    }

    /// Edit a template's schedule. The policy may refuse; nothing is written then.
    pub fn set_template_schedule_options(
        &self,
        template_id: TemplateId,
        requested: TemplateScheduleOptions,
    ) -> Result<Template, ProvisionerError> {
        let template = self.store.get_template(template_id)?;
        let applied = self
            .schedule_policy
            .load()
            .set_options(&template.schedule, requested)?;
        Ok(self.store.update_template_schedule(template_id, applied)?)
    }
}
