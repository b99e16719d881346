/*!
handler.rs - one chat line in, replies out.

`Handler` owns everything a command touches: the Rundeck client, the alias
registry, the authorizer and the time seams. `handle` never fails; every
error becomes its reply text, except unparseable responses which are only
logged.
*/

use crate::alias::{AliasRegistry, JobOptions};
use crate::auth::Authorizer;
use crate::error::CommandError;
use crate::orchestrator::{
    Clock, Orchestrator, PollSettings, Responder, RunRequest, Sleeper, SystemClock, Target,
    TokioSleeper, resolve_job, resolve_target,
};
use crate::rundeck::model::Project;
use crate::rundeck::{Outcome, OutputWindow, RundeckClient, ServerSpec, Transport};

use super::command::{self, AliasAction, ChatCommand, DEFAULT_OUTPUT_LINES};
use super::format;

/// Settings that shape replies and the run workflow.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub group: String,
    pub robot_name: String,
    pub poll: PollSettings,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            group: "rundeck_users".to_string(),
            robot_name: "lita".to_string(),
            poll: PollSettings::default(),
        }
    }
}

pub struct Handler<T> {
    client: RundeckClient<T>,
    server: ServerSpec,
    registry: AliasRegistry,
    authorizer: Box<dyn Authorizer>,
    settings: HandlerSettings,
    clock: Box<dyn Clock>,
    sleeper: Box<dyn Sleeper>,
}

impl<T: Transport> Handler<T> {
    pub fn new(
        client: RundeckClient<T>,
        server: ServerSpec,
        authorizer: Box<dyn Authorizer>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            client,
            server,
            registry: AliasRegistry::new(),
            authorizer,
            settings,
            clock: Box::new(SystemClock),
            sleeper: Box::new(TokioSleeper),
        }
    }

    /// Replace the time seams.
    #[cfg(test)]
    pub fn with_time(mut self, clock: Box<dyn Clock>, sleeper: Box<dyn Sleeper>) -> Self {
        self.clock = clock;
        self.sleeper = sleeper;
        self
    }

    #[cfg(test)]
    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    /// Handle one chat line from `user`.
    pub async fn handle(&mut self, user: &str, text: &str, out: &mut dyn Responder) {
        let result = match command::parse(text) {
            Ok(cmd) => {
                tracing::debug!(user, command = ?cmd, "dispatching");
                self.dispatch(user, cmd, out).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            if e.is_silent() {
                tracing::error!(user, text, error = %e, "command dropped");
            } else {
                tracing::info!(user, text, reply = %e, "command failed");
                out.reply(e.to_string());
            }
        }
    }

    async fn dispatch(
        &mut self,
        user: &str,
        cmd: ChatCommand,
        out: &mut dyn Responder,
    ) -> Result<(), CommandError> {
        match cmd {
            ChatCommand::Info => {
                let info = listing(self.client.get_info().await)?;
                let users = self.authorizer.users_in_group(&self.settings.group);
                out.reply(format::system_info(
                    &info,
                    &users,
                    &self.settings.group,
                    &self.settings.robot_name,
                ));
            }
            ChatCommand::Projects => {
                let projects = listing(self.client.list_projects().await)?;
                out.reply(format::project_list(&self.server, &projects));
            }
            ChatCommand::Jobs => {
                let mut jobs = Vec::new();
                for project in self.projects().await? {
                    jobs.extend(listing(self.client.list_jobs(&project.name).await)?);
                }
                let registry = &self.registry;
                out.reply(format::job_list(&jobs, |job| {
                    registry
                        .alias_for(&job.project, &job.name)
                        .map(|a| a.name.as_str())
                }));
            }
            ChatCommand::Executions { limit } => {
                let mut execs = Vec::new();
                for project in self.projects().await? {
                    execs.extend(listing(
                        self.client.list_executions(&project.name, None).await,
                    )?);
                }
                // Projects are listed one after another; the tail must be the newest runs.
                execs.sort_by_key(|e| (e.started_at, e.id));
                out.reply(format::execution_list(&execs, limit));
            }
            ChatCommand::Running => {
                let mut execs = Vec::new();
                for project in self.projects().await? {
                    execs.extend(listing(self.client.list_running(&project.name).await)?);
                }
                out.reply(format::execution_list(&execs, None));
            }
            ChatCommand::Aliases => out.reply(format::alias_list(self.registry.list())),
            ChatCommand::Alias { action } => out.reply(self.alias(action)),
            ChatCommand::Run {
                alias,
                job,
                options,
                report,
            } => {
                let request = RunRequest {
                    user: user.to_string(),
                    target: command::target(alias.as_deref(), &job),
                    options: options.unwrap_or_default(),
                    report,
                };
                let orchestrator = Orchestrator {
                    client: &self.client,
                    authorizer: self.authorizer.as_ref(),
                    clock: self.clock.as_ref(),
                    sleeper: self.sleeper.as_ref(),
                    settings: self.settings.poll,
                    group: &self.settings.group,
                };
                orchestrator.run(&self.registry, request, out).await?;
            }
            ChatCommand::Options { alias, job } => {
                let target = command::target(alias.as_deref(), &job);
                out.reply(self.options(&target).await?);
            }
            ChatCommand::Output { id, lines } => {
                let window = OutputWindow::LastLines(lines.unwrap_or(DEFAULT_OUTPUT_LINES));
                let page = self
                    .client
                    .get_output(id, window)
                    .await
                    .into_result(CommandError::ExecutionNotFound)?;
                out.reply(format::output_page(&page));
            }
            ChatCommand::Help => out.reply(command::help_text()),
        }
        Ok(())
    }

    fn alias(&mut self, action: AliasAction) -> String {
        let result = match action {
            AliasAction::Register { name, job, options } => self
                .registry
                .register(
                    &name,
                    job.project.as_deref(),
                    job.job.as_deref(),
                    options.unwrap_or_default(),
                )
                .map(|()| "Alias registered"),
            AliasAction::Forget { name } => self.registry.forget(&name).map(|_| "Alias removed"),
        };
        match result {
            Ok(msg) => msg.to_string(),
            Err(e) => e.to_string(),
        }
    }

    async fn options(&self, target: &Target) -> Result<String, CommandError> {
        let (reference, _) = resolve_target(&self.registry, target, JobOptions::new())?;
        let job = resolve_job(&self.client, &reference).await?;
        let definition = self
            .client
            .get_definition(&job.id)
            .await
            .into_result(CommandError::AliasOrJobNotFound)?;
        tracing::debug!(
            job_id = %definition.id,
            job = %definition.name,
            project = %definition.project,
            options = definition.options.len(),
            constrained = definition.options.iter().filter(|o| o.regex.is_some()).count(),
            "job definition loaded"
        );
        Ok(format::job_options(&reference, &definition))
    }

    async fn projects(&self) -> Result<Vec<Project>, CommandError> {
        listing(self.client.list_projects().await)
    }
}

/// Listings have no meaningful "not found"; treat it as a failed request.
fn listing<T>(outcome: Outcome<T>) -> Result<T, CommandError> {
    outcome.into_result(CommandError::Remote("resource not found".to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::auth::StaticAuthorizer;
    use crate::orchestrator::testing::{RecordingSleeper, at};
    use crate::rundeck::client::testing::ScriptedTransport;
    use crate::rundeck::parse_server;

    macro_rules! fixture {
        ($name:literal) => {
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/", $name))
        };
    }

    const USER: &str = "Shell User";

    const FULL_LOG: &str = "Execution 285 output:
  23:16:30 Text of line 1
  23:16:31 Text of line 2
  23:16:32 Text of line 3
  23:16:33 Text of line 4
  23:16:34 Text of line 5
  23:16:35 Text of line 6
  23:16:36 Text of line 7
  23:16:37 Text of line 8
  23:16:38 Text of line 9
  23:16:39 Text of line 10
Execution 285 is complete (took 10.348s)";

    const LAST_FIVE: &str = "Execution 285 output:
  23:16:35 Text of line 6
  23:16:36 Text of line 7
  23:16:37 Text of line 8
  23:16:38 Text of line 9
  23:16:39 Text of line 10
Execution 285 is complete (took 10.348s)";

    const SUBMITTED: &str = "Execution 285 is running. Average job duration is 1.717 seconds.";

    struct Chat {
        transport: Arc<ScriptedTransport>,
        handler: Handler<Arc<ScriptedTransport>>,
        replies: Vec<String>,
    }

    impl Chat {
        fn with_users(users: &[&str]) -> Self {
            let mut groups = BTreeMap::new();
            if !users.is_empty() {
                groups.insert(
                    "rundeck_users".to_string(),
                    users.iter().map(|u| u.to_string()).collect(),
                );
            }
            let transport = Arc::new(ScriptedTransport::new());
            let server = parse_server("https://rundeck.mycompany.org", 10).unwrap();
            let handler = Handler::new(
                RundeckClient::new(transport.clone(), 10),
                server,
                Box::new(StaticAuthorizer::new(groups)),
                HandlerSettings::default(),
            )
            .with_time(
                Box::new(at("2014-08-14T15:06:33Z")),
                Box::new(RecordingSleeper::default()),
            );
            Chat {
                transport,
                handler,
                replies: Vec::new(),
            }
        }

        fn authorized() -> Self {
            Self::with_users(&[USER])
        }

        fn script(&self, bodies: &[&str]) -> &Self {
            for body in bodies {
                self.transport.push(body);
            }
            self
        }

        async fn send(&mut self, text: &str) {
            self.handler.handle(USER, text, &mut self.replies).await;
        }

        fn last(&self) -> Option<&str> {
            self.replies.last().map(String::as_str)
        }
    }

    /* ---- info / listings ---- */

    #[tokio::test]
    async fn info_not_xml_is_silent() {
        let mut chat = Chat::authorized();
        chat.script(&["This is not XML and should fail"]);
        chat.send("rundeck info").await;
        assert!(chat.replies.is_empty());
    }

    #[tokio::test]
    async fn info_without_users() {
        let mut chat = Chat::with_users(&[]);
        chat.script(&[fixture!("info.xml")]);
        chat.send("rundeck info").await;
        assert_eq!(
            chat.last(),
            Some(
                "System Stats for Rundeck 2.0.4 on node rundeck.mycompany.org\nNo users are currently allowed to execute jobs. Ask an admin to 'lita add CHAT_ID rundeck_users'"
            )
        );
    }

    #[tokio::test]
    async fn info_with_users() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("info.xml")]);
        chat.send("rundeck info").await;
        assert_eq!(
            chat.last(),
            Some(
                "System Stats for Rundeck 2.0.4 on node rundeck.mycompany.org\nUsers allowed to execute jobs: Shell User"
            )
        );
    }

    #[tokio::test]
    async fn projects_listing() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("projects.xml")]);
        chat.send("rundeck projects").await;
        assert_eq!(
            chat.last(),
            Some("[Litatest] - https://rundeck.mycompany.org/api/10/project/Litatest")
        );

        chat.script(&[fixture!("projects_empty.xml")]);
        chat.send("rundeck projects").await;
        assert_eq!(chat.last(), Some("No projects found"));
    }

    #[tokio::test]
    async fn jobs_listing_marks_aliases() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("projects.xml"), fixture!("jobs.xml")]);
        chat.send("rundeck alias register aliasfoo --project Litatest --job dateoutput")
            .await;
        chat.send("rundeck jobs").await;
        assert_eq!(
            chat.last(),
            Some("[Litatest] - Foo:Bar;baz\naliasfoo = [Litatest] - dateoutput\n[Litatest] - test2")
        );
    }

    #[tokio::test]
    async fn jobs_listing_empty() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("projects.xml"), fixture!("jobs_empty.xml")]);
        chat.send("rundeck jobs").await;
        assert_eq!(chat.last(), Some("No jobs found"));
    }

    #[tokio::test]
    async fn executions_listing() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("projects.xml"), fixture!("executions.xml")]);
        chat.send("rundeck executions").await;
        let reply = chat.last().unwrap();
        assert_eq!(reply.lines().count(), 10);
        assert_eq!(
            reply.lines().next(),
            Some(
                "254 succeeded Shell User [Litatest] dateoutput SECONDS:60 start:2014-08-10T06:19:22Z end:2014-08-10T06:20:23Z"
            )
        );
        assert!(reply.contains(
            "\n256 succeeded Shell User [Litatest] dateoutput start:2014-08-10T18:21:41Z end:2014-08-10T18:21:41Z\n"
        ));
    }

    #[tokio::test]
    async fn executions_limited_to_two() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("projects.xml"), fixture!("executions.xml")]);
        chat.send("rundeck executions 2").await;
        assert_eq!(
            chat.last(),
            Some(
                "283 succeeded Shell User [Litatest] dateoutput SECONDS:5 start:2014-08-14T02:27:41Z end:2014-08-14T02:27:46Z\n285 succeeded Shell User [Litatest] dateoutput SECONDS:600 start:2014-08-14T15:06:28Z end:2014-08-14T15:16:32Z"
            )
        );
    }

    #[tokio::test]
    async fn executions_limit_spans_projects_by_start_time() {
        let mut chat = Chat::authorized();
        chat.script(&[
            "<result success='true' apiversion='10'><projects count='2'>\
             <project><name>A</name></project><project><name>B</name></project>\
             </projects></result>",
            "<result success='true' apiversion='10'><executions count='2'>\
             <execution id='900' status='succeeded' project='A'><user>u</user>\
             <date-started>2024-01-01T00:00:00Z</date-started></execution>\
             <execution id='901' status='succeeded' project='A'><user>u</user>\
             <date-started>2024-01-02T00:00:00Z</date-started></execution>\
             </executions></result>",
            "<result success='true' apiversion='10'><executions count='2'>\
             <execution id='10' status='succeeded' project='B'><user>u</user>\
             <date-started>2014-01-01T00:00:00Z</date-started></execution>\
             <execution id='11' status='succeeded' project='B'><user>u</user>\
             <date-started>2014-01-02T00:00:00Z</date-started></execution>\
             </executions></result>",
        ]);
        chat.send("rundeck executions 2").await;
        assert_eq!(
            chat.last(),
            Some("900 succeeded u [A] start:2024-01-01T00:00:00Z\n901 succeeded u [A] start:2024-01-02T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn executions_zero_is_bad_format() {
        let mut chat = Chat::authorized();
        chat.send("rundeck executions 0").await;
        assert_eq!(chat.last(), Some("Format is bad, see help for more info"));
        assert!(chat.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn executions_empty() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("projects.xml"), fixture!("executions_empty.xml")]);
        chat.send("rundeck executions").await;
        assert_eq!(chat.last(), Some("No executions found"));
    }

    #[tokio::test]
    async fn running_listing() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("projects.xml"), fixture!("running.xml")]);
        chat.send("rundeck running").await;
        assert_eq!(
            chat.last(),
            Some("285 running Shell User [Litatest] dateoutput SECONDS:30 start:2014-08-14T15:06:28Z")
        );

        chat.script(&[fixture!("projects.xml"), fixture!("running_empty.xml")]);
        chat.send("rundeck running").await;
        assert_eq!(chat.last(), Some("No executions found"));
        assert_eq!(
            chat.transport.paths()[1],
            "api/10/executions/running"
        );
    }

    /* ---- run ---- */

    #[tokio::test]
    async fn run_denied_without_calls() {
        let mut chat = Chat::with_users(&[]);
        chat.send("rundeck run --project Litatest --job dateoutput --options SECONDS=60")
            .await;
        assert_eq!(chat.last(), Some("You aren't authorized to run jobs"));
        assert!(chat.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn run_alias() {
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run.xml"),
        ]);
        chat.send("rundeck alias register aliasfoo --project Litatest --job dateoutput --options foo=bar")
            .await;
        chat.send("rundeck run aliasfoo --options SECONDS=60").await;
        assert_eq!(chat.last(), Some(SUBMITTED));

        let (_, query) = &chat.transport.requests()[2];
        assert!(query.contains(&("argString".to_string(), "-SECONDS 60 -foo bar".to_string())));
        assert!(query.contains(&("asUser".to_string(), USER.to_string())));
    }

    #[tokio::test]
    async fn run_explicit_job() {
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run.xml"),
        ]);
        chat.send("rundeck run --project Litatest --job dateoutput --options SECONDS=60")
            .await;
        assert_eq!(chat.replies, vec![SUBMITTED]);
        assert_eq!(
            chat.transport.paths(),
            vec![
                "api/10/projects",
                "api/10/jobs",
                "api/10/job/b6a3bf6c-8d0b-4a5c-8a8d-3f1a1c8c9d41/run"
            ]
        );
    }

    #[tokio::test]
    async fn run_report_all() {
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run.xml"),
            fixture!("execution.xml"),
            fixture!("output.xml"),
        ]);
        chat.send("rundeck run --project Litatest --job dateoutput --options SECONDS=60 --report all")
            .await;
        assert_eq!(chat.replies.first().map(String::as_str), Some(SUBMITTED));
        assert_eq!(chat.last(), Some(FULL_LOG));
        assert_eq!(chat.replies.len(), 2);
    }

    #[tokio::test]
    async fn run_waits_once_then_reports_all() {
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run.xml"),
            fixture!("running.xml"),
            fixture!("execution.xml"),
            fixture!("output.xml"),
        ]);
        chat.send("rundeck run --project Litatest --job dateoutput --options SECONDS=60 --report all")
            .await;
        assert_eq!(
            chat.replies,
            vec![
                SUBMITTED.to_string(),
                "Execution 285 has been running for 5s (1s average)".to_string(),
                FULL_LOG.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn run_report_last_five() {
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run.xml"),
            fixture!("execution.xml"),
            fixture!("output_limit_five.xml"),
        ]);
        chat.send("rundeck run --project Litatest --job dateoutput --options SECONDS=60 --report 5")
            .await;
        assert_eq!(chat.replies.first().map(String::as_str), Some(SUBMITTED));
        assert_eq!(chat.last(), Some(LAST_FIVE));
        let (path, query) = chat.transport.requests().pop().unwrap();
        assert_eq!(path, "api/10/execution/285/output");
        assert_eq!(query, vec![("lastlines".to_string(), "5".to_string())]);
    }

    #[tokio::test]
    async fn run_unknown_alias() {
        let mut chat = Chat::authorized();
        chat.send("rundeck run not-a-real-alias").await;
        assert_eq!(chat.last(), Some("Can't find an alias or project and job"));
        assert!(chat.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn run_conflict() {
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run.xml"),
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run_conflict.xml"),
        ]);
        let cmd = "rundeck run --project Litatest --job dateoutput --options SECONDS=60";
        chat.send(cmd).await;
        chat.send(cmd).await;
        assert_eq!(
            chat.last(),
            Some("Job is already running and only allows one execution at a time.")
        );
    }

    #[tokio::test]
    async fn run_bad_options() {
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run_options_invalid.xml"),
        ]);
        chat.send("rundeck run --project Litatest --job dateoutput --options SECONDS=XXX")
            .await;
        assert_eq!(
            chat.last(),
            Some(r"Job options were not valid: Option 'SECONDS' doesn't match regular expression \d+, value: XXX")
        );
    }

    #[tokio::test]
    async fn run_missing_run_as_permission() {
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("run_unauthorized.xml"),
        ]);
        chat.send("rundeck run --project Litatest --job dateoutput --options SECONDS=XXX")
            .await;
        assert_eq!(
            chat.last(),
            Some("API token is unauthorized or lacks runAs permission; check the apitoken.aclpolicy")
        );
    }

    /* ---- aliases ---- */

    #[tokio::test]
    async fn alias_lifecycle() {
        let mut chat = Chat::authorized();
        chat.send("rundeck aliases").await;
        assert_eq!(chat.last(), Some("No aliases have been registered yet"));

        chat.send("rundeck alias register aliasfoo --project Litatest --job dateoutput --options foo=bar")
            .await;
        assert_eq!(chat.last(), Some("Alias registered"));

        chat.send("rundeck alias register aliasfoo --project Litatest --job dateoutput")
            .await;
        assert_eq!(chat.last(), Some("Alias already exists"));

        chat.send("rundeck aliases").await;
        assert_eq!(
            chat.last(),
            Some("Alias = [Project] - Job\n aliasfoo = [Litatest] - dateoutput - foo=bar - ")
        );

        chat.send("rundeck alias forget aliasfoo").await;
        assert_eq!(chat.last(), Some("Alias removed"));
        chat.send("rundeck alias forget not-a-real-alias").await;
        assert_eq!(chat.last(), Some("Alias not found"));
        assert!(chat.handler.registry().is_empty());
    }

    #[tokio::test]
    async fn alias_bad_format() {
        let mut chat = Chat::authorized();
        chat.send("rundeck alias register aliasfoo").await;
        assert_eq!(chat.last(), Some("Format is bad, see help for more info"));
    }

    /* ---- options ---- */

    #[tokio::test]
    async fn options_of_explicit_and_aliased_job() {
        let expected = "[Litatest] - dateoutput\n  * SECONDS (REQUIRED) ";
        let mut chat = Chat::authorized();
        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("definition.xml"),
        ]);
        chat.send("rundeck options --project Litatest --job dateoutput")
            .await;
        assert_eq!(chat.last(), Some(expected));

        chat.script(&[
            fixture!("projects.xml"),
            fixture!("jobs.xml"),
            fixture!("definition.xml"),
        ]);
        chat.send("rundeck alias register aliasfoo --project Litatest --job dateoutput")
            .await;
        chat.send("rundeck options aliasfoo").await;
        assert_eq!(chat.last(), Some(expected));
    }

    #[tokio::test]
    async fn options_of_unknown_alias() {
        let mut chat = Chat::authorized();
        chat.send("rundeck options aliasfoo").await;
        assert_eq!(chat.last(), Some("Can't find an alias or project and job"));
    }

    /* ---- output ---- */

    #[tokio::test]
    async fn output_default_lines() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("output.xml")]);
        chat.send("rundeck output 5").await;
        assert_eq!(chat.last(), Some(FULL_LOG));
        assert_eq!(
            chat.transport.requests()[0].1,
            vec![("lastlines".to_string(), "10".to_string())]
        );
    }

    #[tokio::test]
    async fn output_custom_lines() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("output_limit_five.xml")]);
        chat.send("rundeck output 285 5").await;
        assert_eq!(chat.last(), Some(LAST_FIVE));
    }

    #[tokio::test]
    async fn output_empty_log() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("output_empty.xml")]);
        chat.send("rundeck output 6").await;
        assert_eq!(
            chat.last(),
            Some("Execution 6 output:\nExecution 6 is complete (took 0.171s)")
        );
    }

    #[tokio::test]
    async fn output_missing_execution() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("output_exec_noexist.xml")]);
        chat.send("rundeck output 7").await;
        assert_eq!(chat.last(), Some("Can't find execution for this command"));
    }

    #[tokio::test]
    async fn output_not_complete() {
        let mut chat = Chat::authorized();
        chat.script(&[fixture!("output_notcomplete.xml")]);
        chat.send("rundeck output 8").await;
        assert_eq!(
            chat.last(),
            Some(
                "Execution 8 output:\n  23:16:30 Text of line 1\n  23:16:31 Text of line 2\n  23:16:32 Text of line 3\nExecution 8 is not complete (running 3.75s)"
            )
        );
    }

    /* ---- misc ---- */

    #[tokio::test]
    async fn unknown_command_is_bad_format() {
        let mut chat = Chat::authorized();
        chat.send("rundeck frobnicate").await;
        assert_eq!(chat.last(), Some("Format is bad, see help for more info"));
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let mut chat = Chat::authorized();
        chat.send("rundeck projects").await;
        assert!(chat.last().unwrap().starts_with("Rundeck request failed: "));
    }

    #[tokio::test]
    async fn help_reply() {
        let mut chat = Chat::authorized();
        chat.send("rundeck help").await;
        assert!(chat.last().unwrap().contains("alias"));
    }
}
