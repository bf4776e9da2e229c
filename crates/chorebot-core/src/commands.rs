//! Prefix commands: parsing, execution against a [`Household`], and reply
//! rendering.
//!
//! Execution is synchronous and returns a structured [`Reply`]. Rendering
//! is separate so the front end can resolve member display names (which
//! may require a network round trip) without holding the household lock.

use std::collections::HashMap;

use crate::clock::DayKey;
use crate::error::LedgerError;
use crate::household::Household;
use crate::ids::{GroupId, MemberId};
use crate::tasks::TaskEntry;

/// A recognised command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    AddTask {
        task_type: Option<String>,
        detail: Option<String>,
    },
    Done,
    MyTask,
    Report,
    Score,
    Top,
}

impl Command {
    /// Parse a message. Returns `None` for anything that is not a known
    /// command behind `prefix`.
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        let rest = content.strip_prefix(prefix)?;
        let mut args = rest.split_whitespace();
        let name = args.next()?.to_lowercase();

        let command = match name.as_str() {
            "help" => Command::Help,
            "addtask" => {
                let task_type = args.next().map(str::to_string);
                let detail = args.collect::<Vec<_>>().join(" ");
                Command::AddTask {
                    task_type,
                    detail: (!detail.is_empty()).then_some(detail),
                }
            }
            "done" => Command::Done,
            "mytask" => Command::MyTask,
            "report" => Command::Report,
            "score" => Command::Score,
            "top" => Command::Top,
            _ => return None,
        };
        Some(command)
    }
}

/// One line of the daily report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub member: MemberId,
    pub description: String,
}

/// Structured command outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Help {
        catalog: Vec<(String, u32)>,
    },
    MissingTaskType,
    UnknownTaskType {
        given: String,
        known: Vec<(String, u32)>,
    },
    TaskRegistered {
        description: String,
        points: u32,
    },
    NoTaskToday,
    AlreadyDone,
    Done {
        awarded: Option<(String, u32)>,
    },
    MyTask {
        description: String,
        completed: bool,
    },
    EmptyReport,
    Report {
        day: DayKey,
        done: Vec<ReportLine>,
        pending: Vec<ReportLine>,
    },
    Score {
        total: u64,
    },
    EmptyTop,
    Top {
        entries: Vec<(MemberId, u64)>,
    },
}

/// Run `command` for `member` of `group`.
pub fn execute(
    household: &mut Household,
    group: GroupId,
    member: MemberId,
    command: &Command,
    top_limit: usize,
) -> Reply {
    let catalog: Vec<(String, u32)> = household
        .catalog()
        .iter()
        .map(|(name, pts)| (name.to_string(), pts))
        .collect();

    match command {
        Command::Help => Reply::Help { catalog },
        Command::AddTask { task_type: None, .. } => Reply::MissingTaskType,
        Command::AddTask {
            task_type: Some(task_type),
            detail,
        } => match household.register_task(group, member, task_type, detail.as_deref()) {
            Ok(entry) => Reply::TaskRegistered {
                description: entry.description().to_string(),
                points: entry.points(),
            },
            Err(LedgerError::UnknownTaskType { .. }) => Reply::UnknownTaskType {
                given: task_type.clone(),
                known: catalog,
            },
            Err(e) => ledger_reply(e),
        },
        Command::Done => match household.mark_done(group, member) {
            Ok(done) => Reply::Done {
                awarded: done.points_granted.map(|pts| (done.task_type, pts)),
            },
            Err(e) => ledger_reply(e),
        },
        Command::MyTask => match household.get_task(group, member) {
            Ok(entry) => Reply::MyTask {
                description: entry.description().to_string(),
                completed: entry.is_completed(),
            },
            Err(e) => ledger_reply(e),
        },
        Command::Report => {
            let entries = household.list_today(group);
            if entries.is_empty() {
                return Reply::EmptyReport;
            }
            let (done, pending): (Vec<_>, Vec<_>) =
                entries.into_iter().partition(|(_, entry)| entry.is_completed());
            let lines = |items: Vec<(MemberId, TaskEntry)>| -> Vec<ReportLine> {
                items
                    .into_iter()
                    .map(|(member, entry)| ReportLine {
                        member,
                        description: entry.description().to_string(),
                    })
                    .collect()
            };
            Reply::Report {
                day: household.today(),
                done: lines(done),
                pending: lines(pending),
            }
        }
        Command::Score => Reply::Score {
            total: household.get_score(group, member),
        },
        Command::Top => {
            let entries = household.top_scores(group, top_limit);
            if entries.is_empty() {
                Reply::EmptyTop
            } else {
                Reply::Top { entries }
            }
        }
    }
}

fn ledger_reply(err: LedgerError) -> Reply {
    match err {
        LedgerError::UnknownTaskType { task_type, .. } => Reply::UnknownTaskType {
            given: task_type,
            known: Vec::new(),
        },
        LedgerError::NoTaskToday => Reply::NoTaskToday,
        LedgerError::AlreadyDone => Reply::AlreadyDone,
    }
}

impl Reply {
    /// Members whose display names the rendered text will show.
    pub fn mentioned_members(&self) -> Vec<MemberId> {
        match self {
            Reply::Report { done, pending, .. } => {
                done.iter().chain(pending).map(|line| line.member).collect()
            }
            Reply::Top { entries } => entries.iter().map(|(member, _)| *member).collect(),
            _ => Vec::new(),
        }
    }

    /// Render the reply text. Members missing from `names` are mentioned.
    pub fn render(&self, prefix: &str, names: &HashMap<MemberId, String>) -> String {
        let name = |member: &MemberId| {
            names
                .get(member)
                .cloned()
                .unwrap_or_else(|| member.mention())
        };

        match self {
            Reply::Help { catalog } => {
                let types = catalog
                    .iter()
                    .map(|(t, pts)| format!("**{t} ({pts} points)**"))
                    .collect::<Vec<_>>()
                    .join(", ");
                [
                    "**Bot d'assignation de tâches (famille)**".to_string(),
                    format!("`{prefix}addtask <type> [description]` : ajout de ta tâche du jour. Types spéciaux: {types}."),
                    format!("`{prefix}done` : marquer ta tâche du jour comme faite."),
                    format!("`{prefix}mytask` : voir ta tâche du jour."),
                    format!("`{prefix}report` : voir qui a fait / pas fait sa tâche aujourd'hui."),
                    format!("`{prefix}score` : voir ton score total."),
                    format!("`{prefix}top` : classement des scores."),
                ]
                .join("\n")
            }
            Reply::MissingTaskType => format!(
                "Merci d'écrire le type de tâche, par ex: `{prefix}addtask black_usb` ou `{prefix}addtask cloth`.\n\
                 Tu peux aussi ajouter une description: `{prefix}addtask cloth plier les vêtements`."
            ),
            Reply::UnknownTaskType { given, known } => {
                let mut text = format!("Type de tâche inconnu: **{given}**.");
                if !known.is_empty() {
                    let list = known
                        .iter()
                        .map(|(t, pts)| format!("**{t}** ({pts} points)"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    text.push_str(&format!("\nTypes connus: {list}."));
                }
                text
            }
            Reply::TaskRegistered { description, points } => format!(
                "✅ Ta tâche d'aujourd'hui est enregistrée: **{description}** ({points} points quand tu feras `{prefix}done`)."
            ),
            Reply::NoTaskToday => format!(
                "Tu n'as pas encore de tâche pour aujourd'hui. Utilise `{prefix}addtask` pour en ajouter une."
            ),
            Reply::AlreadyDone => "Ta tâche du jour est déjà marquée comme faite 👍".to_string(),
            Reply::Done { awarded } => {
                let gain = awarded
                    .as_ref()
                    .map(|(task_type, pts)| {
                        format!(" Tu gagnes **{pts} points** pour la tâche **{task_type}**.")
                    })
                    .unwrap_or_default();
                format!("🎉 Bravo ! Ta tâche du jour est marquée comme **faite**.{gain}")
            }
            Reply::MyTask {
                description,
                completed,
            } => {
                let status = if *completed {
                    "✅ faite"
                } else {
                    "⏳ pas encore faite"
                };
                format!("Ta tâche d'aujourd'hui: **{description}** ({status})")
            }
            Reply::EmptyReport => "Aucune tâche enregistrée pour aujourd'hui.".to_string(),
            Reply::Report { day, done, pending } => {
                let lines = |items: &[ReportLine], empty: &str| {
                    if items.is_empty() {
                        empty.to_string()
                    } else {
                        items
                            .iter()
                            .map(|line| format!("- {}: **{}**", name(&line.member), line.description))
                            .collect::<Vec<_>>()
                            .join("\n")
                    }
                };
                format!(
                    "📝 **Rapport des tâches pour {day}**\n\n\
                     **✅ Ont fait leur tâche:**\n{}\n\n\
                     **❌ N'ont pas fait leur tâche:**\n{}",
                    lines(done, "- Personne 😅"),
                    lines(pending, "- Personne, tout le monde a bien travaillé ! 🎉"),
                )
            }
            Reply::Score { total } => format!("Ton score total est de **{total} points**."),
            Reply::EmptyTop => "Personne n'a encore de points.".to_string(),
            Reply::Top { entries } => {
                let lines = entries
                    .iter()
                    .enumerate()
                    .map(|(i, (member, pts))| format!("{}. {}: **{pts} points**", i + 1, name(member)))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("🏆 **Top scores de la famille**:\n{lines}")
            }
        }
    }
}
