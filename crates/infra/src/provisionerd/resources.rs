//! Resource ingester.
//!
//! Validates every declared resource, agent and app and turns them into rows.
//! Planning writes nothing: the rows ride along in the job's completion batch,
//! so a bad agent token or a duplicate slug persists nothing.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use provd_core::validation::{ensure_unique_slugs, parse_agent_token};
use provd_core::{AgentId, AppId, DomainError, JobId, ResourceId, WorkspaceTransition};

use crate::store::{AgentRecord, ResourceRecord, WorkspaceAgent, WorkspaceApp, WorkspaceResource};

use super::proto::{Agent, AgentAuth, Resource};

/// Validate `resources` and turn them into rows, without writing anything.
pub fn plan_resources(
    job_id: JobId,
    transition: WorkspaceTransition,
    resources: &[Resource],
    now: DateTime<Utc>,
) -> Result<Vec<ResourceRecord>, DomainError> {
    resources
        .iter()
        .map(|resource| plan_resource(job_id, transition, resource, now))
        .collect()
}

fn plan_resource(
    job_id: JobId,
    transition: WorkspaceTransition,
    resource: &Resource,
    now: DateTime<Utc>,
) -> Result<ResourceRecord, DomainError> {
    let resource_id = ResourceId::new();
    let agents = resource
        .agents
        .iter()
        .map(|agent| plan_agent(resource_id, agent, now))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResourceRecord {
        resource: WorkspaceResource {
            id: resource_id,
            job_id,
            transition,
            name: resource.name.clone(),
            resource_type: resource.resource_type.clone(),
            daily_cost: resource.daily_cost,
            created_at: now,
        },
        agents,
    })
}

fn plan_agent(
    resource_id: ResourceId,
    agent: &Agent,
    now: DateTime<Utc>,
) -> Result<AgentRecord, DomainError> {
    let (auth_token, auth_instance_id) = match &agent.auth {
        Some(AgentAuth::Token(raw)) => (parse_agent_token(raw)?, None),
        Some(AgentAuth::InstanceId(id)) => (Uuid::new_v4(), Some(id.clone())),
        None => (Uuid::new_v4(), None),
    };
    ensure_unique_slugs(&agent.name, agent.apps.iter().map(|app| app.slug.as_str()))?;

    let agent_id = AgentId::new();
    let environment_variables = serde_json::Value::Object(
        agent
            .env
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
    );
    let apps = agent
        .apps
        .iter()
        .map(|app| WorkspaceApp {
            id: AppId::new(),
            agent_id,
            slug: app.slug.clone(),
            display_name: app.display_name.clone(),
            command: app.command.clone(),
            url: app.url.clone(),
            icon: app.icon.clone(),
            subdomain: app.subdomain,
            created_at: now,
        })
        .collect();

    Ok(AgentRecord {
        agent: WorkspaceAgent {
            id: agent_id,
            resource_id,
            name: agent.name.clone(),
            auth_token,
            auth_instance_id,
            operating_system: agent.operating_system.clone(),
            architecture: agent.architecture.clone(),
            directory: agent.directory.clone(),
            environment_variables,
            startup_script: agent.startup_script.clone(),
            shutdown_script: agent.shutdown_script.clone(),
            created_at: now,
        },
        apps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use provd_core::{UserId, WorkerId};

    use crate::jobs::{Job, JobKind, JobStatus};
    use crate::provisionerd::ProvisionerError;
    use crate::provisionerd::proto::App;
    use crate::store::{InMemoryProvisionerStore, JobCompletion, ProvisionerStore};

    struct Fixture {
        store: InMemoryProvisionerStore,
        job_id: JobId,
        worker: WorkerId,
    }

    fn running_job() -> Fixture {
        let store = InMemoryProvisionerStore::new();
        let worker = WorkerId::new();
        let mut job = Job::new(JobKind::TemplateDryRun, UserId::new(), serde_json::Value::Null);
        job.mark_running(worker, Utc::now());
        let job = store.insert_job(job).unwrap();
        Fixture {
            store,
            job_id: job.id,
            worker,
        }
    }

    /// Plan `resources` and persist them with the job's completion, the way
    /// the engine does.
    fn ingest(fx: &Fixture, resources: &[Resource]) -> Result<Job, ProvisionerError> {
        let now = Utc::now();
        let records = plan_resources(fx.job_id, WorkspaceTransition::Start, resources, now)?;
        let completion = JobCompletion {
            job_id: fx.job_id,
            worker_id: fx.worker,
            allow_recompletion: false,
            status: JobStatus::Succeeded,
            error: None,
            completed_at: now,
        };
        Ok(fx.store.finish_job(completion, records)?)
    }

    fn app(slug: &str) -> App {
        App {
            slug: slug.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn resource_without_agents() {
        let fx = running_job();
        ingest(
            &fx,
            &[Resource {
                name: "something".to_string(),
                resource_type: "aws_instance".to_string(),
                ..Default::default()
            }],
        )
        .unwrap();

        let resources = fx.store.get_workspace_resources_by_job_id(fx.job_id).unwrap();
        assert_eq!(resources.len(), 1);
        assert!(
            fx.store
                .get_workspace_agents_by_resource_id(resources[0].id)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn malformed_token_persists_nothing() {
        let fx = running_job();
        let err = ingest(
            &fx,
            &[
                Resource {
                    name: "fine".to_string(),
                    resource_type: "aws_instance".to_string(),
                    ..Default::default()
                },
                Resource {
                    name: "broken".to_string(),
                    resource_type: "aws_instance".to_string(),
                    agents: vec![Agent {
                        name: "dev".to_string(),
                        auth: Some(AgentAuth::Token("bananas".to_string())),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
        )
        .unwrap_err();

        assert!(err.to_string().contains("invalid auth token format; must be uuid"));
        assert!(fx.store.get_workspace_resources_by_job_id(fx.job_id).unwrap().is_empty());
        assert_eq!(fx.store.get_job(fx.job_id).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn duplicate_slug_within_agent_is_rejected() {
        let fx = running_job();
        let err = ingest(
            &fx,
            &[Resource {
                name: "something".to_string(),
                resource_type: "aws_instance".to_string(),
                agents: vec![Agent {
                    name: "dev".to_string(),
                    apps: vec![app("a"), app("a")],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        )
        .unwrap_err();

        assert!(matches!(err, ProvisionerError::Validation(_)));
        assert!(err.to_string().contains("duplicate app slug"));
        assert!(fx.store.get_workspace_resources_by_job_id(fx.job_id).unwrap().is_empty());
    }

    #[test]
    fn same_slug_on_different_agents_is_fine() {
        let agents = ["one", "two"]
            .into_iter()
            .map(|name| Agent {
                name: name.to_string(),
                apps: vec![app("a")],
                ..Default::default()
            })
            .collect();
        let records = plan_resources(
            JobId::new(),
            WorkspaceTransition::Start,
            &[Resource {
                name: "something".to_string(),
                resource_type: "aws_instance".to_string(),
                agents,
                ..Default::default()
            }],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(records[0].agents.len(), 2);
    }

    #[test]
    fn agent_fields_are_stored_verbatim() {
        let fx = running_job();
        let token = Uuid::new_v4();
        let mut env = BTreeMap::new();
        env.insert("something".to_string(), "test".to_string());

        ingest(
            &fx,
            &[Resource {
                name: "something".to_string(),
                resource_type: "aws_instance".to_string(),
                daily_cost: 10,
                agents: vec![Agent {
                    name: "dev".to_string(),
                    operating_system: "linux".to_string(),
                    architecture: "amd64".to_string(),
                    env,
                    startup_script: Some("value".to_string()),
                    shutdown_script: Some("bye".to_string()),
                    auth: Some(AgentAuth::Token(token.to_string())),
                    apps: vec![app("a")],
                    ..Default::default()
                }],
            }],
        )
        .unwrap();

        let resources = fx.store.get_workspace_resources_by_job_id(fx.job_id).unwrap();
        assert_eq!(resources[0].daily_cost, 10);
        assert_eq!(resources[0].transition, WorkspaceTransition::Start);

        let agents = fx.store.get_workspace_agents_by_resource_id(resources[0].id).unwrap();
        let agent = &agents[0];
        assert_eq!(agent.auth_token, token);
        assert_eq!(agent.operating_system, "linux");
        assert_eq!(agent.architecture, "amd64");
        assert_eq!(agent.startup_script.as_deref(), Some("value"));
        assert_eq!(agent.shutdown_script.as_deref(), Some("bye"));
        assert_eq!(
            agent.environment_variables,
            serde_json::json!({"something": "test"})
        );

        let apps = fx.store.get_workspace_apps_by_agent_id(agent.id).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].slug, "a");
    }

    #[test]
    fn agents_without_token_get_one() {
        let records = plan_resources(
            JobId::new(),
            WorkspaceTransition::Stop,
            &[Resource {
                name: "vm".to_string(),
                resource_type: "gcp_instance".to_string(),
                agents: vec![Agent {
                    name: "dev".to_string(),
                    auth: Some(AgentAuth::InstanceId("i-123".to_string())),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            Utc::now(),
        )
        .unwrap();
        let agent = &records[0].agents[0].agent;
        assert!(!agent.auth_token.is_nil());
        assert_eq!(agent.auth_instance_id.as_deref(), Some("i-123"));
    }
}
