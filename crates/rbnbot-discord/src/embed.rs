use serenity::builder::CreateEmbed;
use serenity::model::Colour;

use rbnbot_core::RichMessage;

/// Build the embed for a spot batch: titled, coloured, one inline field.
pub fn rich_embed(message: &RichMessage) -> CreateEmbed {
    CreateEmbed::new()
        .title(&message.title)
        .colour(Colour::new(message.color))
        .field(&message.field_name, &message.field_value, true)
}
