//! Serenity event handler. Translates gateway events into router events and
//! applies the resulting [`Effect`] to the hosting message.

use serenity::async_trait;
use serenity::builder::{
    CreateAttachment, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateMessage, EditMessage,
};
use serenity::client::{Context, EventHandler};
use serenity::model::application::{ComponentInteraction, ComponentInteractionDataKind, Interaction};
use serenity::model::channel::{Message, Reaction, ReactionType};
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, MessageId};
use tracing::{debug, error, info, warn};

use super::commands::{self, CommandContext, CommandReply};
use super::events::{companion_from_reaction, parse_component, COMPANION_REACTIONS};
use super::router::{failure_notice, Effect, Router};
use crate::errors::BotError;
use crate::store::SessionKey;
use crate::ui::discord::{components, embed, reply_parts, scrape_prompt};
use crate::ui::response::format_reply;

/// Embeds per message when listing recently added items
const EMBEDS_PER_MESSAGE: usize = 5;
const NOT_AUTHORIZED: &str = "You’re not authorized!";

pub struct Handler {
    router: Router,
    commands: CommandContext,
}

impl Handler {
    pub fn new(router: Router, commands: CommandContext) -> Self {
        Self { router, commands }
    }

    async fn send_text(&self, ctx: &Context, channel: ChannelId, text: &str) {
        let (content, file) = reply_parts(format_reply(text));
        let mut message = CreateMessage::new().content(content);
        if let Some(file) = file {
            message = message.add_file(file);
        }
        if let Err(e) = channel.send_message(&ctx.http, message).await {
            error!("Failed to send message: {}", e);
        }
    }

    async fn send_reply(&self, ctx: &Context, channel: ChannelId, reply: CommandReply) {
        match reply {
            CommandReply::Text(text) => self.send_text(ctx, channel, &text).await,
            CommandReply::Cards { header, cards } => {
                self.send_text(ctx, channel, &header).await;
                for chunk in cards.chunks(EMBEDS_PER_MESSAGE) {
                    let embeds: Vec<CreateEmbed> = chunk.iter().map(embed).collect();
                    if let Err(e) = channel
                        .send_message(&ctx.http, CreateMessage::new().embeds(embeds))
                        .await
                    {
                        error!("Failed to send embeds: {}", e);
                    }
                }
            }
            CommandReply::Session {
                card,
                session,
                image,
            } => {
                let mut main = embed(&card);
                let mut message = CreateMessage::new();
                if let Some((filename, bytes)) = image {
                    main = main.image(format!("attachment://{}", filename));
                    message = message.add_file(CreateAttachment::bytes(bytes, filename));
                }
                let sent = match channel.send_message(&ctx.http, message.embed(main)).await {
                    Ok(sent) => sent,
                    Err(e) => {
                        error!("Failed to send session message: {}", e);
                        return;
                    }
                };
                // Component ids carry the message id, so they are attached after sending
                let key = sent.id.get();
                let view = self.router.open(key, session);
                if let Err(e) = channel
                    .edit_message(&ctx.http, sent.id, EditMessage::new().components(components(key, &view)))
                    .await
                {
                    error!("Failed to attach components to session {}: {}", key, e);
                    self.router.store().remove(key);
                }
            }
        }
    }

    async fn followup_text(&self, ctx: &Context, interaction: &ComponentInteraction, text: &str) {
        let (content, file) = reply_parts(format_reply(text));
        let mut followup = CreateInteractionResponseFollowup::new()
            .content(content)
            .ephemeral(true);
        if let Some(file) = file {
            followup = followup.add_file(file);
        }
        if let Err(e) = interaction.create_followup(&ctx.http, followup).await {
            error!("Failed to send follow-up: {}", e);
        }
    }

    async fn apply_effect(
        &self,
        ctx: &Context,
        channel: ChannelId,
        key: SessionKey,
        effect: Effect,
        interaction: Option<&ComponentInteraction>,
    ) {
        if effect.is_noop() {
            debug!(session = key, "Nothing to update");
            return;
        }
        let message_id = MessageId::new(key);

        if effect.view.is_some() || effect.card.is_some() {
            let mut edit = EditMessage::new();
            if let Some(card) = &effect.card {
                edit = edit.embed(embed(card));
            }
            if let Some(view) = &effect.view {
                edit = edit.components(components(key, view));
            }
            if let Err(e) = channel.edit_message(&ctx.http, message_id, edit).await {
                error!(session = key, "Failed to update message: {}", e);
            }
        }

        if let Some(count) = effect.reactions {
            if let Err(e) = channel.delete_reactions(&ctx.http, message_id).await {
                warn!(session = key, "Could not clear reactions: {}", e);
            }
            for emoji in COMPANION_REACTIONS.iter().take(count) {
                if let Err(e) = channel
                    .create_reaction(&ctx.http, message_id, ReactionType::Unicode(emoji.to_string()))
                    .await
                {
                    warn!(session = key, "Could not add reaction {}: {}", emoji, e);
                }
            }
        }

        if let Some(stage) = effect.failed_stage {
            warn!(session = key, stage = stage.display_name(), "Scrape step failed");
        }

        if let Some(text) = &effect.notice {
            match interaction {
                Some(interaction) => self.followup_text(ctx, interaction, text).await,
                None => self.send_text(ctx, channel, text).await,
            }
        }

        if let (Some(prompt), Some(interaction)) = (&effect.followup, interaction) {
            let prompt = scrape_prompt(key, prompt);
            let mut followup = CreateInteractionResponseFollowup::new()
                .content(prompt.content)
                .components(prompt.rows)
                .ephemeral(true);
            if let Some(file) = prompt.attachment {
                followup = followup.add_file(file);
            }
            if let Err(e) = interaction.create_followup(&ctx.http, followup).await {
                error!(session = key, "Failed to send scrape prompt: {}", e);
            }
        }
    }

    async fn handle_component(&self, ctx: &Context, interaction: ComponentInteraction) {
        if let Err(e) = interaction
            .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
            .await
        {
            error!("Failed to acknowledge interaction: {}", e);
            return;
        }

        let values = match &interaction.data.kind {
            ComponentInteractionDataKind::StringSelect { values } => values.clone(),
            _ => Vec::new(),
        };
        let Some((key, event)) = parse_component(&interaction.data.custom_id, &values) else {
            warn!("Unrecognized component id '{}'", interaction.data.custom_id);
            return;
        };

        let actor = interaction.user.id.get();
        match self.router.handle(key, actor, event.clone()).await {
            Ok(effect) => {
                self.apply_effect(ctx, interaction.channel_id, key, effect, Some(&interaction))
                    .await
            }
            Err(e) => {
                warn!(session = key, actor, "Event failed: {}", e.diagnostics());
                self.followup_text(ctx, &interaction, &failure_notice(&event, &e))
                    .await;
            }
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let config = &self.commands.config;
        let Some(command) = commands::parse(&config.bot_prefix, &msg.content) else {
            return;
        };
        if !config.is_whitelisted(&msg.author.name, msg.author.id.get()) {
            info!(user = %msg.author.name, "Rejected command from non-whitelisted user");
            self.send_text(&ctx, msg.channel_id, NOT_AUTHORIZED).await;
            return;
        }
        info!(user = %msg.author.name, ?command, "Running command");
        let reply = self.commands.run(command, msg.author.id.get()).await;
        self.send_reply(&ctx, msg.channel_id, reply).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            self.handle_component(&ctx, component).await;
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let Some(user_id) = reaction.user_id else {
            return;
        };
        if user_id == ctx.cache.current_user().id {
            return;
        }
        let ReactionType::Unicode(emoji) = &reaction.emoji else {
            return;
        };
        let Some(event) = companion_from_reaction(emoji) else {
            return;
        };
        let key = reaction.message_id.get();
        if !self.router.store().contains(key) {
            return;
        }
        match self.router.handle(key, user_id.get(), event.clone()).await {
            Ok(effect) => {
                self.apply_effect(&ctx, reaction.channel_id, key, effect, None)
                    .await
            }
            Err(e) => {
                info!(session = key, "Reaction ignored: {}", e);
                if !matches!(e, BotError::Unauthorized | BotError::Busy | BotError::Expired) {
                    self.send_text(&ctx, reaction.channel_id, &failure_notice(&event, &e))
                        .await;
                }
            }
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected", ready.user.name);
    }
}
