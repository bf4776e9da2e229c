//! Gateway event handler: translates Discord events into household calls.

use chorebot_core::{
    execute, AccrualConfig, AccrualHandle, AccrualScheduler, Command, CommandsConfig, Config,
    GroupId, MemberId, PresenceChange, SharedHousehold,
};
use serenity::all::{ChannelId, Context, EventHandler, Guild, GuildId, Message, Ready, UserId, VoiceState};
use serenity::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub struct Handler {
    household: SharedHousehold,
    accrual: AccrualConfig,
    commands: CommandsConfig,
    scheduler: Arc<Mutex<Option<AccrualHandle>>>,
}

impl Handler {
    pub fn new(
        household: SharedHousehold,
        config: &Config,
        scheduler: Arc<Mutex<Option<AccrualHandle>>>,
    ) -> Self {
        Self {
            household,
            accrual: config.accrual.clone(),
            commands: config.commands.clone(),
            scheduler,
        }
    }

    /// Start accrual once; gateway reconnects fire `ready` again.
    fn ensure_scheduler(&self) {
        let mut slot = self.scheduler.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            let scheduler = AccrualScheduler::new(self.household.clone(), &self.accrual);
            *slot = Some(scheduler.start());
        }
    }

    /// `old` is `None` when the gateway cache had no previous state; the
    /// tracker then decides from who it already holds as present.
    fn apply_voice_change(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        old: Option<&VoiceState>,
        after: Option<ChannelId>,
    ) -> PresenceChange {
        let group = GroupId(guild_id.get());
        let member = MemberId(user_id.get());
        match old {
            Some(old) => {
                let (had_channel, has_channel, channel_changed) = transition(old.channel_id, after);
                self.household.with(|h| {
                    h.on_presence_change(group, member, had_channel, has_channel, channel_changed)
                })
            }
            None => self
                .household
                .with(|h| h.on_uncached_change(group, member, after.is_some())),
        }
    }
}

/// Before/after channel occupancy as the three flags the tracker expects.
fn transition(before: Option<ChannelId>, after: Option<ChannelId>) -> (bool, bool, bool) {
    (before.is_some(), after.is_some(), before != after)
}

/// Non-bot members holding a channel, from `(user, channel, is_bot)` rows.
fn members_in_voice<I>(states: I) -> BTreeSet<MemberId>
where
    I: IntoIterator<Item = (UserId, Option<ChannelId>, bool)>,
{
    states
        .into_iter()
        .filter(|(_, channel, is_bot)| channel.is_some() && !is_bot)
        .map(|(user, _, _)| MemberId(user.get()))
        .collect()
}

/// Look up display names; members that cannot be fetched are left out.
async fn resolve_names(ctx: &Context, guild_id: GuildId, members: &[MemberId]) -> HashMap<MemberId, String> {
    let mut names = HashMap::new();
    for member in members {
        match guild_id.member(ctx, UserId::new(member.0)).await {
            Ok(m) => {
                names.insert(*member, m.display_name().to_string());
            }
            Err(e) => {
                debug!(guild = %guild_id, %member, error = %e, "display name lookup failed");
            }
        }
    }
    names
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "connected to gateway");
        self.ensure_scheduler();
    }

    /// Sync presence with the guild's voice snapshot. This also runs after
    /// a re-identify, so members who left meanwhile are dropped here.
    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        let in_voice = members_in_voice(guild.voice_states.values().map(|state| {
            let is_bot = state
                .member
                .as_ref()
                .or_else(|| guild.members.get(&state.user_id))
                .is_some_and(|m| m.user.bot);
            (state.user_id, state.channel_id, is_bot)
        }));
        let group = GroupId(guild.id.get());
        let changes = self.household.with(|h| h.reconcile_presence(group, &in_voice));
        debug!(%group, in_voice = in_voice.len(), changes = changes.len(), "voice presence synced");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let Some(command) = Command::parse(&self.commands.prefix, &msg.content) else {
            return;
        };

        let group = GroupId(guild_id.get());
        let member = MemberId(msg.author.id.get());
        debug!(%group, %member, ?command, "command received");

        let reply = self
            .household
            .with(|h| execute(h, group, member, &command, self.commands.top_limit));
        let names = resolve_names(&ctx, guild_id, &reply.mentioned_members()).await;
        let text = reply.render(&self.commands.prefix, &names);

        if let Err(e) = msg.reply(&ctx, text).await {
            warn!(%group, %member, error = %e, "failed to send reply");
        }
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        if new.member.as_ref().is_some_and(|m| m.user.bot) {
            return;
        }
        let change = self.apply_voice_change(guild_id, new.user_id, old.as_ref(), new.channel_id);
        if change != PresenceChange::Unchanged {
            info!(guild = %guild_id, member = %new.user_id, ?change, "voice presence changed");
        }
    }
}
