use anyhow::Result;
use axum::extract::Multipart;
use axum::extract::multipart::Field;

use botforge_db::models::UploadedFile;

/// Decoded chatbot create/edit form. Both routes post the same multipart
/// shape; file parts the browser left empty are skipped.
#[derive(Debug, Default)]
pub struct ChatbotForm {
    pub name: String,
    pub system_prompt: String,
    pub welcome_message: String,
    pub text_files: Vec<UploadedFile>,
    pub css_file: Option<UploadedFile>,
}

pub async fn read_chatbot_form(mut multipart: Multipart) -> Result<ChatbotForm> {
    let mut form = ChatbotForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => form.name = field.text().await?.trim().to_string(),
            "system_prompt" => form.system_prompt = field.text().await?,
            "welcome_message" => form.welcome_message = field.text().await?,
            "textfiles" => {
                if let Some(file) = read_file(field).await? {
                    form.text_files.push(file);
                }
            }
            "cssfile" => {
                if let Some(file) = read_file(field).await? {
                    form.css_file = Some(file);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Uploads are stored as text: bytes are decoded as UTF-8 with invalid
/// sequences replaced. Binary content is not supported.
async fn read_file(field: Field<'_>) -> Result<Option<UploadedFile>> {
    let filename = field.file_name().unwrap_or_default().to_string();
    if filename.is_empty() {
        return Ok(None);
    }

    let bytes = field.bytes().await?;
    Ok(Some(UploadedFile {
        filename,
        content: String::from_utf8_lossy(&bytes).into_owned(),
    }))
}
