//! Timed special abilities.
//!
//! Every ability shares one state machine (idle, active, cooling) and differs
//! only in the effect it applies to its owner. Effects stash the exact values
//! they overwrite on start and write them back on end, so a character never
//! keeps a mutated stat after the ability expires.

use skirmish_core::game::EntityId;
use skirmish_core::loadout::AbilityKind;

use crate::character::Body;
use crate::geometry::Vec2;
use crate::obstacle::Obstacle;
use crate::weapon::Weapon;
use crate::world::EntityIds;

/// Peak speed multiplier at the start of a dash.
pub const DASH_SPEED_MULTIPLIER: f32 = 2.2;
pub const ENLARGE_RADIUS_MULTIPLIER: f32 = 1.4;
pub const ENLARGE_HEALTH_MULTIPLIER: f32 = 1.5;
/// Flat heal on top of the scaled health when enlarging.
pub const ENLARGE_BONUS_HP: f32 = 100.0;
pub const ENLARGE_DEFENSE: f32 = 0.5;
pub const BERSERK_DAMAGE_MULTIPLIER: f32 = 1.2;
pub const BERSERK_COOLDOWN_MULTIPLIER: f32 = 0.5;
/// Shield height relative to its width.
pub const SHIELD_ASPECT: f32 = 40.0 / 12.0;
/// Gap between the owner's edge and the shield's near face.
pub const SHIELD_GAP: f32 = 2.0;

/// Everything an ability effect may touch.
pub struct AbilityContext<'a> {
    pub body: &'a mut Body,
    pub weapon: &'a mut Weapon,
    pub obstacles: &'a mut Vec<Obstacle>,
    pub ids: &'a mut EntityIds,
}

/// Observable phase of an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityState {
    /// Ready to initiate.
    Idle,
    Active,
    /// Expired and waiting for the cooldown to run out.
    Cooling,
}

/// Hooks an ability kind implements to mutate and restore its owner.
trait Effect {
    fn on_start(&mut self, ctx: &mut AbilityContext<'_>);
    /// `remaining` is the fraction of the duration still to run, in `[0, 1]`.
    fn on_update(&mut self, _ctx: &mut AbilityContext<'_>, _remaining: f32) {}
    fn on_end(&mut self, ctx: &mut AbilityContext<'_>);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dash {
    original_speed: Option<f32>,
}

impl Effect for Dash {
    fn on_start(&mut self, ctx: &mut AbilityContext<'_>) {
        let speed = ctx.body.speed;
        self.original_speed = Some(speed);
        ctx.body.speed = speed * DASH_SPEED_MULTIPLIER;
    }

    fn on_update(&mut self, ctx: &mut AbilityContext<'_>, remaining: f32) {
        if let Some(speed) = self.original_speed {
            ctx.body.speed = speed * (1.0 + (DASH_SPEED_MULTIPLIER - 1.0) * remaining);
        }
    }

    fn on_end(&mut self, ctx: &mut AbilityContext<'_>) {
        if let Some(speed) = self.original_speed.take() {
            ctx.body.speed = speed;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EnlargeStash {
    radius: f32,
    max_hp: f32,
    defense: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enlarge {
    stash: Option<EnlargeStash>,
}

impl Effect for Enlarge {
    fn on_start(&mut self, ctx: &mut AbilityContext<'_>) {
        let body = &mut *ctx.body;
        self.stash = Some(EnlargeStash {
            radius: body.radius,
            max_hp: body.max_hp,
            defense: body.defense,
        });
        body.radius *= ENLARGE_RADIUS_MULTIPLIER;
        body.max_hp *= ENLARGE_HEALTH_MULTIPLIER;
        body.hp = (body.hp * ENLARGE_HEALTH_MULTIPLIER + ENLARGE_BONUS_HP).min(body.max_hp);
        body.defense = ENLARGE_DEFENSE;
    }

    fn on_end(&mut self, ctx: &mut AbilityContext<'_>) {
        if let Some(stash) = self.stash.take() {
            let body = &mut *ctx.body;
            body.radius = stash.radius;
            body.max_hp = stash.max_hp;
            body.defense = stash.defense;
            body.hp = body.hp.min(body.max_hp);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BerserkStash {
    damage: f32,
    fire_cooldown: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Berserk {
    stash: Option<BerserkStash>,
}

impl Effect for Berserk {
    fn on_start(&mut self, ctx: &mut AbilityContext<'_>) {
        let weapon = &mut *ctx.weapon;
        self.stash = Some(BerserkStash {
            damage: weapon.damage,
            fire_cooldown: weapon.fire_cooldown,
        });
        weapon.damage *= BERSERK_DAMAGE_MULTIPLIER;
        weapon.fire_cooldown *= BERSERK_COOLDOWN_MULTIPLIER;
        weapon.restock();
        weapon.unlimited_ammo = true;
    }

    fn on_end(&mut self, ctx: &mut AbilityContext<'_>) {
        if let Some(stash) = self.stash.take() {
            let weapon = &mut *ctx.weapon;
            weapon.damage = stash.damage;
            weapon.fire_cooldown = stash.fire_cooldown;
            weapon.unlimited_ammo = false;
            weapon.ammo = weapon.max_ammo;
            weapon.is_reloading = false;
            weapon.current_reload = 0.0;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShieldWall {
    deployed: Option<EntityId>,
}

impl Effect for ShieldWall {
    fn on_start(&mut self, ctx: &mut AbilityContext<'_>) {
        let body = &*ctx.body;
        let w = body.radius * 2.0;
        let h = w * SHIELD_ASPECT;
        let offset = body.radius + SHIELD_GAP + w / 2.0;
        let center = body.pos + Vec2::from_angle(body.angle) * offset;
        let id = ctx.ids.next_id();
        ctx.obstacles
            .push(Obstacle::shield(id, center, w, h, body.angle));
        self.deployed = Some(id);
    }

    fn on_end(&mut self, ctx: &mut AbilityContext<'_>) {
        if let Some(id) = self.deployed.take() {
            ctx.obstacles.retain(|o| o.id != id);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbilityEffect {
    Dash(Dash),
    Enlarge(Enlarge),
    Berserk(Berserk),
    Shield(ShieldWall),
}

impl AbilityEffect {
    fn as_effect(&mut self) -> &mut dyn Effect {
        match self {
            Self::Dash(e) => e,
            Self::Enlarge(e) => e,
            Self::Berserk(e) => e,
            Self::Shield(e) => e,
        }
    }
}

/// A character's special ability and its timers.
#[derive(Debug, Clone, PartialEq)]
pub struct Ability {
    pub kind: AbilityKind,
    pub cooldown: f32,
    pub duration: f32,
    pub current_cooldown: f32,
    pub current_duration: f32,
    pub is_active: bool,
    effect: AbilityEffect,
}

impl Ability {
    pub fn new(kind: AbilityKind) -> Self {
        let (cooldown, duration, effect) = match kind {
            AbilityKind::Dash => (50.0, 50.0, AbilityEffect::Dash(Dash::default())),
            AbilityKind::Enlarge => (500.0, 150.0, AbilityEffect::Enlarge(Enlarge::default())),
            AbilityKind::Berserk => (500.0, 150.0, AbilityEffect::Berserk(Berserk::default())),
            AbilityKind::Shield => (500.0, 450.0, AbilityEffect::Shield(ShieldWall::default())),
        };
        Self {
            kind,
            cooldown,
            duration,
            current_cooldown: 0.0,
            current_duration: 0.0,
            is_active: false,
            effect,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }

    pub fn state(&self) -> AbilityState {
        if self.is_active {
            AbilityState::Active
        } else if self.current_cooldown > 0.0 {
            AbilityState::Cooling
        } else {
            AbilityState::Idle
        }
    }

    /// Activate the ability. Only succeeds from [`AbilityState::Idle`].
    pub fn initiate(&mut self, ctx: &mut AbilityContext<'_>) -> bool {
        if self.state() != AbilityState::Idle {
            return false;
        }
        self.is_active = true;
        self.current_cooldown = self.cooldown;
        self.current_duration = self.duration;
        self.effect.as_effect().on_start(ctx);
        true
    }

    /// Advance timers by `dt`. The cooldown only runs down once the effect has ended.
    pub fn update(&mut self, dt: f32, ctx: &mut AbilityContext<'_>) {
        if self.is_active {
            let remaining = if self.duration > 0.0 {
                (self.current_duration / self.duration).clamp(0.0, 1.0)
            } else {
                0.0
            };
            self.effect.as_effect().on_update(ctx, remaining);
            self.current_duration = (self.current_duration - dt).max(0.0);
            if self.current_duration <= 0.0 {
                self.is_active = false;
                self.effect.as_effect().on_end(ctx);
            }
        } else {
            self.current_cooldown = (self.current_cooldown - dt).max(0.0);
        }
    }

    /// End any running effect and return to idle, as on death.
    pub fn force_end(&mut self, ctx: &mut AbilityContext<'_>) {
        if self.is_active {
            self.is_active = false;
            self.effect.as_effect().on_end(ctx);
        }
        self.current_cooldown = 0.0;
        self.current_duration = 0.0;
    }
}
